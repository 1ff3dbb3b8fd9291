//! # prehydrate
//!
//! **prehydrate** coordinates asynchronous data initialization for applications
//! rendered on the server and hydrated on the client.
//!
//! A server render pass starts every labelled init function once, pauses the
//! parts of the render that wait for them, and ships the settled results (plus
//! state snapshots) to the client. The client rebuilds the same registry from
//! that payload and skips work the server already did.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  rendering unit          rendering unit          rendering unit
//!  InitHook::render(deps)  InitHook::render(deps)  InitHook::render(deps)
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Services (one per server request / client session)              │
//! │  - Coordinator      (server: suspend / ready, client: run / reuse) │
//! │  - SuspenseRegistry (label ─► Pending │ Settled │ Failed)          │
//! │  - Store            (named StateContainers, immutable snapshots)   │
//! │  - ApiService       (reqwest client, endpoints per namespace)      │
//! │  - History          (pop-state events)                             │
//! └──────┬──────────────────────────┬───────────────────────┬─────────┘
//!        │ publish(Event)           │                       │
//!        ▼                          │                       │
//! ┌───────────────┐                 │ dehydrate()           │
//! │ Bus           │                 ▼                       │
//! └──────┬────────┘        HydrationPayload ── JSON ──► ServicesBuilder::hydrate()
//!        ▼                 { suspense, state }              (client)
//!  SubscriberSet ──► LogWriter / custom subscribers
//! ```
//!
//! ### Server pass
//! ```text
//! render ─► hook.render() ─► label absent ─► wait_with(label, init) ─► Render::Suspend
//!                                                                        │
//!                       await Suspend::settled() ◄───────────────────────┘
//! render ─► hook.render() ─► Settled(value) ─► Render::Ready(value)
//! response ─► services.dehydrate() ─► payload.to_script_json()
//! ```
//!
//! ### Client
//! ```text
//! Services::builder(cfg).hydrate(payload).build()
//! hook.render(deps) ─► label present ─► delete(label)     Render::Reused
//!                   ─► otherwise     ─► spawn init        Render::Invoked
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Coordinator**   | Per-render init decisions and back/forward re-runs.      | [`Coordinator`], [`InitHook`], [`Render`]   |
//! | **Suspense**      | Per-pass registry of labelled deferred jobs.             | [`SuspenseRegistry`], [`Suspend`]           |
//! | **State**         | Named containers of immutable snapshots.                 | [`StateContainer`], [`Patch`], [`Store`]    |
//! | **API**           | HTTP facade with per-namespace endpoints.                | [`ApiService`], [`Endpoint`]                |
//! | **Subscriber API**| Hook into registry, render and state events.             | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors with stable labels.                         | [`RegistryError`], [`InitError`], ...       |
//! | **Configuration** | Layered defaults, TOML file and environment overrides.   | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use prehydrate::{
//!     CategoriesState, Config, InitOptions, QueryParams, Render, RenderEnv, Services,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = Services::builder(Config::for_env(RenderEnv::Client))
//!         .with_state(CategoriesState::from_context)
//!         .build()?;
//!
//!     let categories = services
//!         .state::<CategoriesState>(CategoriesState::NAME)
//!         .ok_or("categories not registered")?;
//!     let mut hook = services.coordinator().mount(
//!         categories.init(QueryParams::new().limit(1000)),
//!         InitOptions::new().with_ssr("categories"),
//!     );
//!
//!     // nothing came from the server, so the client loads by itself
//!     assert!(matches!(hook.render(("ru",))?, Render::Invoked));
//!     assert!(matches!(hook.render(("ru",))?, Render::Unchanged));
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod telemetry;

pub mod api;
pub mod events;
pub mod init;
pub mod modules;
pub mod state;
pub mod subscribers;
pub mod suspense;
pub mod utils;

// ---- Public re-exports ----

pub use crate::config::{
    ApiConfig, Config, EndpointConfig, LogFormat, LoggingConfig, NavigationConfig, RenderEnv,
    StoreConfig,
};
pub use crate::core::{HydrationPayload, Services, ServicesBuilder, StateContext};
pub use crate::error::{
    ApiError, BuildError, InitError, JobError, LoadError, PatchError, RegistryError, StateError,
};
pub use crate::telemetry::init_tracing;

pub use api::{ApiResponse, ApiService, CrudEndpoint, Endpoint, Issue, QueryParams};
pub use events::{Bus, Event, EventKind};
pub use init::{Coordinator, History, Init, InitFn, InitHook, InitOptions, InitRef, PopState, Render};
pub use modules::CategoriesState;
pub use state::{JsonPatch, Patch, Replace, Snapshot, StateContainer, StateModule, Store};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use suspense::{EntryStatus, PendingJob, Suspend, SuspensePayload, SuspenseRegistry};
pub use utils::{TreeItem, TreeNode, list_to_tree};
