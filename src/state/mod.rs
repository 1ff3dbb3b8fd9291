//! # State containers.
//!
//! - [`StateContainer`]: named container of immutable [`Snapshot`]s
//! - [`Patch`]: how a new snapshot is derived ([`Replace`], [`JsonPatch`] or a typed patch)
//! - [`StateModule`] / [`Store`]: named modules of one pass and their hydration

mod container;
mod patch;
mod snapshot;
mod store;

pub use container::StateContainer;
pub use patch::{JsonPatch, Patch, Replace, merge_json};
pub use snapshot::Snapshot;
pub use store::{StateModule, StatePayload, Store};
