//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] for events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Registry / InitHook / StateContainer ── publish(Event) ──► Bus
//!                                                             │
//!                                          Services::event_listener
//!                                                             │
//!                                                      SubscriberSet
//!                                                 ┌───────────┼───────────┐
//!                                                 ▼           ▼           ▼
//!                                             LogWriter    Metrics      Custom
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
