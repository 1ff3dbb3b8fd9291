//! # Options of an init hook.
//!
//! ```rust
//! use prehydrate::InitOptions;
//!
//! let opts = InitOptions::new()
//!     .with_ssr("categories")
//!     .with_back_forward(true);
//! assert_eq!(opts.ssr(), Some("categories"));
//! assert!(!opts.force());
//! ```

use std::sync::Arc;

/// How and where an init function runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    ssr: Option<Arc<str>>,
    force: bool,
    on_back_forward: bool,
}

impl InitOptions {
    /// Client-only init: no server pass, no forced re-run, no navigation hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the function during the server pass under `label`.
    ///
    /// The client uses the same label to detect that the server already did the work.
    pub fn with_ssr(mut self, label: impl Into<Arc<str>>) -> Self {
        self.ssr = Some(label.into());
        self
    }

    /// Runs the function on the client even if the server already did.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Runs the function again on every back/forward navigation.
    pub fn with_back_forward(mut self, on: bool) -> Self {
        self.on_back_forward = on;
        self
    }

    pub fn ssr(&self) -> Option<&str> {
        self.ssr.as_deref()
    }

    pub(crate) fn ssr_label(&self) -> Option<Arc<str>> {
        self.ssr.clone()
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn on_back_forward(&self) -> bool {
        self.on_back_forward
    }
}
