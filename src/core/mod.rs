//! # Per-pass service container.
//!
//! - [`Services`]: config, API, store, suspense registry, history and event bus of one pass
//! - [`ServicesBuilder`] / [`StateContext`]: assembly and state module construction
//! - [`HydrationPayload`]: what the server hands to the client

mod builder;
mod hydration;
mod services;

pub use builder::{ServicesBuilder, StateContext};
pub use hydration::HydrationPayload;
pub use services::Services;
