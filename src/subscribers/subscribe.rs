//! # Subscriber extension point.
//!
//! Implement [`Subscribe`] to observe what a render pass does: jobs entering
//! and leaving the suspense registry, coordinator decisions, state transitions.
//!
//! A [`SubscriberSet`](super::SubscriberSet) gives every subscriber its own
//! worker and bounded queue, so a slow or panicking subscriber never stalls
//! rendering or its neighbours. Panics surface as `EventKind::SubscriberPanicked`.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use prehydrate::{Event, EventKind, Subscribe};
//!
//! struct SuspendCounter;
//!
//! #[async_trait]
//! impl Subscribe for SuspendCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::RenderSuspended) {
//!             // count suspended renders per label
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "suspend-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// Handlers run on a worker task owned by the subscriber set and receive
/// events in publish order. Keep them non-blocking.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name reported in overflow and panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue size for this subscriber; values below 1 are raised to 1.
    fn queue_capacity(&self) -> usize {
        256
    }
}
