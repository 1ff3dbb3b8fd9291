//! # Navigation history events.
//!
//! [`History`] broadcasts [`PopState`] events (browser back/forward) to every
//! init hook that asked for them. The navigation layer calls [`History::pop`].

use std::sync::Arc;

use tokio::sync::broadcast;

/// A back/forward navigation to `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopState {
    pub location: Arc<str>,
}

/// Broadcast source of [`PopState`] events.
#[derive(Clone, Debug)]
pub struct History {
    tx: broadcast::Sender<PopState>,
}

impl History {
    /// Creates a history with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Notifies listeners of a back/forward navigation.
    pub fn pop(&self, location: impl Into<Arc<str>>) {
        let _ = self.tx.send(PopState {
            location: location.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PopState> {
        self.tx.subscribe()
    }

    /// Number of active listeners.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(16)
    }
}
