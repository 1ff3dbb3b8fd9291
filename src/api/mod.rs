//! # API facade.
//!
//! - [`ApiService`]: shared HTTP client, token header and per-namespace endpoint cache
//! - [`Endpoint`]: data access for one namespace; [`CrudEndpoint`] is the default
//! - [`QueryParams`], [`ApiResponse`], [`Issue`]: request and response shapes

mod endpoint;
mod service;
mod types;

pub use endpoint::{CrudEndpoint, Endpoint};
pub use service::ApiService;
pub use types::{ApiResponse, Issue, QueryParams};
