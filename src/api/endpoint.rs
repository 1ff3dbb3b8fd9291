//! # Endpoints of the API facade.
//!
//! An [`Endpoint`] serves one namespace (`categories`, `users`, ...). The
//! default implementation, [`CrudEndpoint`], maps the namespace to a REST
//! collection:
//!
//! ```text
//! find_many(params)     ─► GET {base_url}{path}?{params}
//! find_one(id, params)  ─► GET {base_url}{path}/{id}?{params}
//! ```
//!
//! Non-success responses are classified:
//! - body with a non-null `error.data` ─► [`ApiError::Validation`]
//! - anything else                     ─► [`ApiError::Status`]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::api::types::{ApiResponse, Issue, QueryParams};
use crate::error::ApiError;

/// Data access for one API namespace.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Namespace the endpoint serves.
    fn namespace(&self) -> &str;

    /// Fetches a list.
    async fn find_many(&self, params: &QueryParams) -> Result<ApiResponse, ApiError>;

    /// Fetches a single item.
    async fn find_one(&self, id: &str, params: &QueryParams) -> Result<ApiResponse, ApiError>;
}

/// HTTP plumbing shared by every endpoint of one [`ApiService`](super::ApiService).
pub(crate) struct Transport {
    client: Client,
    base_url: String,
    headers: RwLock<HeaderMap>,
}

impl Transport {
    pub(crate) fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: RwLock::new(HeaderMap::new()),
        }
    }

    pub(crate) fn headers(&self) -> &RwLock<HeaderMap> {
        &self.headers
    }

    async fn get(&self, path: &str, params: &QueryParams) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.headers.read().clone();
        let query: Vec<(&str, &str)> = params.iter().collect();

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(&query)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::trace!(%url, status = status.as_u16(), "api response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(classify(status, &body))
        }
    }
}

/// Turns a non-success response into an [`ApiError`].
///
/// Any non-null `error.data` marks a validation failure, whatever shape its
/// `issues` take.
fn classify(status: StatusCode, body: &str) -> ApiError {
    let status = status.as_u16();
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = parsed.get("error");

    if let Some(data) = error.and_then(|e| e.get("data")).filter(|d| !d.is_null()) {
        return ApiError::Validation {
            status,
            issues: Issue::list_from(data.get("issues")),
        };
    }
    let message = match error.and_then(|e| e.get("message")).and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => body.chars().take(200).collect(),
    };
    ApiError::Status { status, message }
}

/// REST collection endpoint.
pub struct CrudEndpoint {
    transport: Arc<Transport>,
    namespace: String,
    path: String,
}

impl CrudEndpoint {
    pub(crate) fn new(transport: Arc<Transport>, namespace: &str, path: String) -> Self {
        Self {
            transport,
            namespace: namespace.to_string(),
            path: path.trim_end_matches('/').to_string(),
        }
    }

    /// Collection path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Endpoint for CrudEndpoint {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn find_many(&self, params: &QueryParams) -> Result<ApiResponse, ApiError> {
        self.transport.get(&self.path, params).await
    }

    async fn find_one(&self, id: &str, params: &QueryParams) -> Result<ApiResponse, ApiError> {
        let path = format!("{}/{}", self.path, id);
        self.transport.get(&path, params).await
    }
}
