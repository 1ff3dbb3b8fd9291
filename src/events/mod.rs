//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the suspense registry, the init
//! coordinator, state containers and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `SuspenseRegistry` (job lifecycle), `InitHook` (render
//!   decisions), `StateContainer` (transitions), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the `Services` event listener, which fans out to the
//!   `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
