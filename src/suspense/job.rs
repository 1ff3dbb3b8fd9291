//! # Deferred jobs and the suspension control value.
//!
//! A job registered in the [`SuspenseRegistry`](super::SuspenseRegistry) is wrapped
//! into a [`PendingJob`]: a cloneable, shared future that every awaiter of the same
//! label polls. The wrapper races the job against its cancellation token and
//! reports the outcome back to the registry **before** any awaiter observes it.
//!
//! ## Flow
//! ```text
//! job future ──► drive(label, job, cancel, on_done)
//!                  ├─ cancel.cancelled() ─► Err(JobError::Canceled)
//!                  └─ job completes      ─► Ok(value) / Err(JobError::Fail)
//!                  on_done(&outcome)     ─► registry: Pending → Settled / Failed
//!                  return outcome        ─► every awaiter gets the same clone
//! ```
//!
//! ## Rules
//! - The job body runs **at most once** no matter how many awaiters exist.
//! - `on_done` runs exactly once, inside the shared future.
//! - A renderer that receives [`Suspend`] awaits [`Suspend::settled`] and renders again.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// Outcome of a deferred job.
pub type JobOutcome = Result<Value, JobError>;

/// Boxed job future as stored by the registry.
pub type BoxJob = BoxFuture<'static, JobOutcome>;

/// Shared handle to an in-flight job.
///
/// Cloning is cheap; all clones resolve to the same [`JobOutcome`].
#[derive(Clone)]
pub struct PendingJob {
    label: Arc<str>,
    fut: Shared<BoxJob>,
}

impl PendingJob {
    /// Returns the label the job is registered under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the outcome if the job already completed.
    pub fn peek(&self) -> Option<&JobOutcome> {
        self.fut.peek()
    }

    /// Waits for the job to complete.
    pub async fn settled(self) -> JobOutcome {
        self.fut.await
    }
}

impl IntoFuture for PendingJob {
    type Output = JobOutcome;
    type IntoFuture = Shared<BoxJob>;

    fn into_future(self) -> Self::IntoFuture {
        self.fut
    }
}

impl fmt::Debug for PendingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingJob")
            .field("label", &self.label)
            .field("done", &self.fut.peek().is_some())
            .finish()
    }
}

/// Control value telling the rendering environment to pause a subtree until
/// the job behind `label` settles, then render again.
///
/// This is not an error: it is the explicit form of "not ready yet".
#[derive(Clone, Debug)]
pub struct Suspend {
    job: PendingJob,
}

impl Suspend {
    pub(crate) fn new(job: PendingJob) -> Self {
        Self { job }
    }

    /// Label of the job the render is waiting for.
    pub fn label(&self) -> &str {
        self.job.label()
    }

    /// The job the render is waiting for.
    pub fn job(&self) -> &PendingJob {
        &self.job
    }

    /// Waits until the job settles (successfully or not).
    pub async fn settled(self) -> JobOutcome {
        self.job.settled().await
    }
}

/// Wraps `job` into a shared, cancellable future that calls `on_done` with the
/// outcome before handing it to awaiters.
pub(crate) fn drive<F, D>(
    label: impl Into<Arc<str>>,
    job: F,
    cancel: CancellationToken,
    on_done: D,
) -> PendingJob
where
    F: Future<Output = JobOutcome> + Send + 'static,
    D: FnOnce(&JobOutcome) + Send + 'static,
{
    let fut: BoxJob = async move {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Canceled),
            out = job => out,
        };
        on_done(&outcome);
        outcome
    }
    .boxed();

    PendingJob {
        label: label.into(),
        fut: fut.shared(),
    }
}
