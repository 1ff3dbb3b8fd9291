//! # Fan-out of bus events to subscribers.
//!
//! ```text
//! emit(event) ─┬─► queue 1 ─► worker 1 ─► sub1.on_event()
//!              └─► queue N ─► worker N ─► subN.on_event()
//! ```
//!
//! Each subscriber sees events in emit order; there is no ordering between
//! subscribers. `emit` never waits: a full queue loses the event for that
//! subscriber and a `SubscriberOverflow` is published instead. Handlers run
//! under `AssertUnwindSafe`, so a panic while holding a lock may leave that
//! subscriber's own state inconsistent.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct Lane {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Delivers events to a fixed group of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Requires a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            lanes.push(Lane {
                name: sub.name(),
                tx,
            });
            workers.push(tokio::spawn(drain(sub, rx, bus.clone())));
        }
        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Copies `event` once and queues it for every subscriber.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Queues a shared event for every subscriber without waiting.
    ///
    /// A full or closed queue drops the event for that subscriber only and
    /// reports `SubscriberOverflow`. Overflow events are never re-reported.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let report = !matches!(event.kind, EventKind::SubscriberOverflow);

        for lane in &self.lanes {
            let reason = match lane.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            tracing::debug!(subscriber = lane.name, reason, seq = event.seq, "event dropped");
            if report {
                self.bus
                    .publish(Event::subscriber_overflow(lane.name, reason));
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Closes every queue and waits until workers have handled what was queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Worker loop for one subscriber. Panics are contained per event.
async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&event))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            let info = panic_message(payload.as_ref());
            tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
