//! # Broadcast bus shared by one [`Services`](crate::Services) instance.
//!
//! ```text
//!   SuspenseRegistry ──┐
//!   InitHook         ──┼──► Bus ──► EventListener ──► SubscriberSet
//!   StateContainer   ──┘
//! ```
//!
//! Publishing never waits. The ring buffer is bounded: a receiver that falls
//! behind gets `RecvError::Lagged` and loses the oldest events. Nothing is
//! retained when no receiver exists.

use tokio::sync::broadcast;

use super::event::Event;

/// Fire-and-forget event channel. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `event` to current receivers; dropped silently when there are none.
    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            tracing::trace!("event published without receivers");
        }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(1024)
    }
}
