//! # Named state container with immutable snapshots.
//!
//! ```text
//! update(patch, "transition")
//!   lock writer ─► apply(patch, current) ─┬─ Ok(next)  ─► store Snapshot{version+1}
//!                                         │               publish StateUpdated, notify watchers
//!                                         └─ Err(why)  ─► keep current snapshot
//!                                                         publish StateRejected
//! ```
//!
//! Readers never lock: [`StateContainer::current`] loads the snapshot through
//! `ArcSwap`. Writers are serialized by a mutex, so versions increase by one per
//! successful update and no update is lost.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::StateError;
use crate::events::{Bus, Event, EventKind};
use crate::state::patch::Patch;
use crate::state::snapshot::Snapshot;

/// Holds the current snapshot of one named state.
pub struct StateContainer<S> {
    name: Arc<str>,
    current: ArcSwap<Snapshot<S>>,
    writer: Mutex<()>,
    changes: watch::Sender<u64>,
    bus: Bus,
    log: bool,
}

impl<S> StateContainer<S>
where
    S: Send + Sync + 'static,
{
    /// Creates a container holding `initial` at version 0.
    pub fn new(name: impl Into<Arc<str>>, initial: S, bus: Bus) -> Self {
        let (changes, _rx) = watch::channel(0);
        Self {
            name: name.into(),
            current: ArcSwap::from_pointee(Snapshot::new(0, initial)),
            writer: Mutex::new(()),
            changes,
            bus,
            log: false,
        }
    }

    /// Enables `debug` logging of every transition.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    /// Name the container is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current snapshot.
    pub fn current(&self) -> Arc<Snapshot<S>> {
        self.current.load_full()
    }

    /// Version of the current snapshot.
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Receiver that observes the version of every new snapshot.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Applies `patch` and publishes the resulting snapshot.
    ///
    /// `transition` names the change in logs and events.
    ///
    /// ### Errors
    /// [`StateError::Malformed`] if the patch is rejected; the current snapshot
    /// is left untouched.
    pub fn update<P>(&self, patch: P, transition: &str) -> Result<Arc<Snapshot<S>>, StateError>
    where
        P: Patch<S>,
    {
        let next = {
            let _writer = self.writer.lock();
            let prev = self.current.load_full();
            match patch.apply(prev.data()) {
                Ok(data) => {
                    let next = Arc::new(Snapshot::new(prev.version() + 1, data));
                    self.current.store(Arc::clone(&next));
                    next
                }
                Err(err) => {
                    tracing::warn!(store = %self.name, transition, reason = %err, "patch rejected");
                    self.bus.publish(
                        Event::new(EventKind::StateRejected)
                            .with_label(Arc::clone(&self.name))
                            .with_transition(transition)
                            .with_reason(err.to_string()),
                    );
                    return Err(StateError::Malformed {
                        store: self.name.to_string(),
                        reason: err.0,
                    });
                }
            }
        };

        if self.log {
            tracing::debug!(store = %self.name, transition, version = next.version(), "state updated");
        }
        self.changes.send_replace(next.version());
        self.bus.publish(
            Event::new(EventKind::StateUpdated)
                .with_label(Arc::clone(&self.name))
                .with_transition(transition)
                .with_version(next.version()),
        );
        Ok(next)
    }
}
