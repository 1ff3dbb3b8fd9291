use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::ClientBuilder;
use reqwest::header::{HeaderName, HeaderValue};

use crate::api::endpoint::{CrudEndpoint, Endpoint, Transport};
use crate::config::ApiConfig;
use crate::error::ApiError;

/// Facade over the backend API: one shared HTTP client, one endpoint per namespace.
///
/// Endpoints are created on first use and cached. Namespaces without a
/// registered implementation get a [`CrudEndpoint`] at the configured path.
pub struct ApiService {
    config: ApiConfig,
    transport: Arc<Transport>,
    endpoints: RwLock<HashMap<String, Arc<dyn Endpoint>>>,
}

impl ApiService {
    /// Builds the HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the underlying reqwest client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(concat!("prehydrate/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            ApiError::Transport(e)
        })?;

        Ok(Self {
            config: config.clone(),
            transport: Arc::new(Transport::new(client, &config.base_url)),
            endpoints: RwLock::new(HashMap::new()),
        })
    }

    /// Sets or clears the session token header.
    ///
    /// No-op when no token header is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidHeader`] if the header name or token is not a
    /// valid HTTP header.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), ApiError> {
        let Some(header) = self.config.token_header() else {
            return Ok(());
        };
        let invalid = || ApiError::InvalidHeader {
            name: header.to_string(),
        };
        let name = HeaderName::from_bytes(header.as_bytes()).map_err(|_| invalid())?;

        let mut headers = self.transport.headers().write();
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                let mut value = HeaderValue::from_str(token).map_err(|_| invalid())?;
                value.set_sensitive(true);
                headers.insert(name, value);
            }
            None => {
                headers.remove(name);
            }
        }
        Ok(())
    }

    /// Returns the endpoint serving `namespace`, creating the default one on first use.
    pub fn endpoint(&self, namespace: &str) -> Arc<dyn Endpoint> {
        if let Some(endpoint) = self.endpoints.read().get(namespace) {
            return Arc::clone(endpoint);
        }

        let mut endpoints = self.endpoints.write();
        let endpoint = endpoints.entry(namespace.to_string()).or_insert_with(|| {
            Arc::new(CrudEndpoint::new(
                Arc::clone(&self.transport),
                namespace,
                self.config.endpoint_path(namespace),
            ))
        });
        Arc::clone(endpoint)
    }

    /// Installs a custom endpoint for its namespace, replacing any cached one.
    pub fn register_endpoint(&self, endpoint: Arc<dyn Endpoint>) {
        let namespace = endpoint.namespace().to_string();
        self.endpoints.write().insert(namespace, endpoint);
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}
