//! # Events published on the [`Bus`](super::Bus).
//!
//! Every event carries a process-wide `seq` number, so subscribers can restore
//! publish order even when their queues interleave. Kinds fall into four groups:
//! subscriber delivery problems, suspense jobs, render decisions and state
//! transitions. Which optional fields are filled depends on the kind; each
//! variant lists them.
//!
//! ```rust
//! use prehydrate::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StateUpdated)
//!     .with_label("categories")
//!     .with_transition("categories: loaded")
//!     .with_version(3);
//!
//! assert_eq!(ev.kind, EventKind::StateUpdated);
//! assert_eq!(ev.label.as_deref(), Some("categories"));
//! assert_eq!(ev.version, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Subscriber panicked during event processing.
    ///
    /// Fields: label, reason.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Fields: label, reason.
    SubscriberOverflow,

    // suspense registry
    /// A job was registered under a label (`Absent → Pending`).
    ///
    /// Fields: label.
    JobRegistered,

    /// A pending job settled with a value (`Pending → Settled`).
    ///
    /// Fields: label.
    JobSettled,

    /// A pending job failed (`Pending → Failed`).
    ///
    /// Fields: label, reason.
    JobFailed,

    /// A pending job was cancelled by a request abort.
    ///
    /// Fields: label.
    JobCanceled,

    /// An entry was deleted from the registry.
    ///
    /// Fields: label.
    JobConsumed,

    // coordinator
    /// A server render suspended on a pending label.
    ///
    /// Fields: label.
    RenderSuspended,

    /// The coordinator invoked the init function on the client.
    ///
    /// Fields: label, reason (`mount`, `deps`, `force` or `popstate`).
    InitInvoked,

    /// The coordinator reused a server result instead of invoking the init function.
    ///
    /// Fields: label.
    InitReused,

    /// A client-side init function failed (logged, never propagated).
    ///
    /// Fields: label, reason.
    InitFailed,

    // state containers
    /// A state container produced a new snapshot.
    ///
    /// Fields: label, transition, version.
    StateUpdated,

    /// A state container rejected a malformed patch.
    ///
    /// Fields: label, transition, reason.
    StateRejected,
}

/// A single runtime event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Publish order across the process.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job label, container name or subscriber name.
    pub label: Option<Arc<str>>,
    /// State transition name.
    pub transition: Option<Arc<str>>,
    /// Snapshot version after a state transition.
    pub version: Option<u64>,
    /// Human-readable reason (errors, overflow details, triggers).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Stamps a new event with the next sequence number and the current time.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            label: None,
            transition: None,
            version: None,
            reason: None,
        }
    }

    /// Attaches a label (job label, container or subscriber name).
    #[inline]
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attaches a state transition name.
    #[inline]
    pub fn with_transition(mut self, transition: impl Into<Arc<str>>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    /// Attaches a snapshot version.
    #[inline]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Subscriber queue rejected an event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_label(subscriber)
            .with_reason(reason)
    }

    /// Subscriber handler panicked.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_label(subscriber)
            .with_reason(info)
    }

    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
