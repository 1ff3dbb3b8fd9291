//! # Initialization coordinator.
//!
//! - [`Coordinator`] / [`InitHook`]: per-render decisions ([`Render`]) for one rendering unit
//! - [`Init`] / [`InitFn`]: the async function a unit wants to run
//! - [`InitOptions`]: `ssr` label, `force`, back/forward re-run
//! - [`History`]: pop-state events driving back/forward re-runs

mod coordinator;
mod history;
mod init_fn;
mod options;

pub use coordinator::{Coordinator, InitHook, Render};
pub use history::{History, PopState};
pub use init_fn::{BoxInitFuture, Init, InitFn, InitRef};
pub use options::InitOptions;
