//! # Deferred-initialization ("suspense") registry.
//!
//! - [`SuspenseRegistry`] - per-pass ledger of labelled async jobs
//! - [`PendingJob`] / [`Suspend`] - shared in-flight job and the explicit
//!   "pause this render" control value
//! - [`SuspensePayload`] - settled entries serialized for client hydration

mod job;
mod payload;
mod registry;

pub use job::{BoxJob, JobOutcome, PendingJob, Suspend};
pub use payload::SuspensePayload;
pub use registry::{EntryStatus, SuspenseRegistry};
