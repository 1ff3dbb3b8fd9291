//! # LogWriter: forwards runtime events to `tracing`
//!
//! A subscriber that turns every [`Event`] into a structured `tracing` record.
//! Job failures and subscriber problems are logged at `warn`, state transitions
//! and render decisions at `debug`, everything else at `trace`.
//!
//! ## Example output (fmt layer)
//! ```text
//! DEBUG prehydrate::subscribers::log: job registered label="categories" seq=4
//! WARN  prehydrate::subscribers::log: job failed label="categories" reason="http status 500: boom"
//! DEBUG prehydrate::subscribers::log: state updated label="categories" transition="categories: loaded" version=2
//! ```

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let label = e.label.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::JobRegistered => debug!(label, seq = e.seq, "job registered"),
            EventKind::JobSettled => debug!(label, seq = e.seq, "job settled"),
            EventKind::JobFailed => warn!(label, reason, "job failed"),
            EventKind::JobCanceled => debug!(label, "job cancelled"),
            EventKind::JobConsumed => trace!(label, "registry entry consumed"),
            EventKind::RenderSuspended => trace!(label, "render suspended"),
            EventKind::InitInvoked => debug!(label, trigger = reason, "init invoked"),
            EventKind::InitReused => debug!(label, "init reused server result"),
            EventKind::InitFailed => warn!(label, reason, "init failed"),
            EventKind::StateUpdated => debug!(
                label,
                transition = e.transition.as_deref().unwrap_or(""),
                version = e.version.unwrap_or_default(),
                "state updated"
            ),
            EventKind::StateRejected => warn!(
                label,
                transition = e.transition.as_deref().unwrap_or(""),
                reason,
                "state patch rejected"
            ),
            EventKind::SubscriberOverflow => warn!(subscriber = label, reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => warn!(subscriber = label, reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
