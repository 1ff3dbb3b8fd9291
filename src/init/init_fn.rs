//! # Init functions.
//!
//! [`Init`] is the unit of work a rendering unit asks the coordinator to run:
//! an async function producing a JSON value. [`InitFn`] wraps a closure
//! `F: Fn() -> Fut`, creating a fresh future per call, so the same function can
//! run on mount, on dependency changes and on every back/forward navigation.
//!
//! ## Example
//! ```rust
//! use prehydrate::{InitFn, InitRef, JobError};
//! use serde_json::json;
//!
//! let init: InitRef = InitFn::arc(|| async { Ok::<_, JobError>(json!({"items": []})) });
//! # let _ = init;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::suspense::JobOutcome;

/// Boxed future returned by [`Init::call`].
pub type BoxInitFuture = BoxFuture<'static, JobOutcome>;

/// Shared handle to an init function.
pub type InitRef = Arc<dyn Init>;

/// Async initialization function.
pub trait Init: Send + Sync + 'static {
    /// Creates a new future running the function once.
    fn call(&self) -> BoxInitFuture;
}

/// Closure-backed [`Init`].
#[derive(Debug)]
pub struct InitFn<F> {
    f: F,
}

impl<F> InitFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the init function and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Init for InitFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    fn call(&self) -> BoxInitFuture {
        Box::pin((self.f)())
    }
}
