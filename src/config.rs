//! # Runtime configuration.
//!
//! [`Config`] selects the rendering environment and configures the API facade,
//! state logging, navigation and the event bus.
//!
//! ## Loading order (later overrides earlier)
//! 1. compiled defaults for the selected [`RenderEnv`] ([`Config::for_env`])
//! 2. TOML file named by `PREHYDRATE_CONFIG` (default `config/prehydrate.toml`, optional)
//! 3. `PREHYDRATE`-prefixed environment variables, `__` separating nested keys
//!
//! Environment-dependent defaults (API base URL, state logging) follow the
//! `env` value found in the file or the environment.
//!
//! # Example
//! ```
//! use prehydrate::{Config, RenderEnv};
//!
//! let cfg = Config::for_env(RenderEnv::Server);
//! assert_eq!(cfg.api.base_url, "http://localhost:8132");
//! assert!(!cfg.store.log);
//!
//! let cfg = Config::for_env(RenderEnv::Client);
//! assert_eq!(cfg.api.base_url, "");
//! assert_eq!(cfg.api.token_header(), Some("X-Token"));
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use ::config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Where the current pass runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEnv {
    /// Server-side render pass (one per request).
    Server,
    /// Client session after hydration.
    #[default]
    Client,
}

impl RenderEnv {
    pub fn is_server(self) -> bool {
        matches!(self, RenderEnv::Server)
    }
}

/// API facade settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL prepended to every endpoint path.
    pub base_url: String,
    /// Header carrying the session token (empty = token never sent).
    pub token_header: String,
    /// Request timeout in milliseconds (0 = no timeout).
    pub timeout_ms: u64,
    /// Per-namespace endpoint overrides.
    pub endpoints: HashMap<String, EndpointConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_header: "X-Token".to_string(),
            timeout_ms: 0,
            endpoints: HashMap::new(),
        }
    }
}

impl ApiConfig {
    /// Token header name, `None` when disabled.
    pub fn token_header(&self) -> Option<&str> {
        Some(self.token_header.as_str()).filter(|h| !h.is_empty())
    }

    /// Request timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Path of the endpoint serving `namespace`.
    pub fn endpoint_path(&self, namespace: &str) -> String {
        self.endpoints
            .get(namespace)
            .and_then(|e| e.path.clone())
            .unwrap_or_else(|| format!("/api/v1/{namespace}"))
    }
}

/// Overrides for a single endpoint namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path relative to the base URL, e.g. `/api/v2/categories`.
    pub path: Option<String>,
}

/// State container settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Log every state transition at `debug`.
    pub log: bool,
}

/// Navigation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Path prefix the application is served under.
    pub basename: String,
    /// Capacity of the pop-state broadcast channel.
    pub history_capacity: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            basename: "/".to_string(),
            history_capacity: 16,
        }
    }
}

/// Output format of the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `prehydrate=debug` (`RUST_LOG` wins).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Configuration of one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering environment.
    pub env: RenderEnv,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub navigation: NavigationConfig,
    pub logging: LoggingConfig,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Client defaults, see [`Config::for_env`].
    fn default() -> Self {
        Self::for_env(RenderEnv::Client)
    }
}

impl Config {
    /// Defaults for `env`:
    /// - server: API at `http://localhost:8132`, state logging off
    /// - client: relative API base URL, state logging on
    /// - `bus_capacity = 1024`
    pub fn for_env(env: RenderEnv) -> Self {
        Self {
            env,
            api: ApiConfig {
                base_url: Self::default_base_url(env).to_string(),
                ..ApiConfig::default()
            },
            store: StoreConfig {
                log: !env.is_server(),
            },
            navigation: NavigationConfig::default(),
            logging: LoggingConfig::default(),
            bus_capacity: 1024,
        }
    }

    /// Loads layered configuration from `path` (the file is optional).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let layered = || {
            ::config::Config::builder()
                .add_source(File::with_name(&path).required(false))
                .add_source(Environment::with_prefix("PREHYDRATE").separator("__"))
        };

        let env = match layered().build()?.get::<RenderEnv>("env") {
            Ok(env) => env,
            Err(ConfigError::NotFound(_)) => RenderEnv::default(),
            Err(err) => return Err(err),
        };
        let defaults = Self::for_env(env);

        layered()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("store.log", defaults.store.log)?
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from `PREHYDRATE_CONFIG` or `config/prehydrate.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PREHYDRATE_CONFIG")
            .unwrap_or_else(|_| "config/prehydrate.toml".to_string());
        Self::from_file(path)
    }

    /// Bus capacity, at least 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn is_server(&self) -> bool {
        self.env.is_server()
    }

    fn default_base_url(env: RenderEnv) -> &'static str {
        match env {
            RenderEnv::Server => "http://localhost:8132",
            RenderEnv::Client => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("prehydrate-{}-{name}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_falls_back_to_client_defaults() {
        let cfg = Config::from_file("/nonexistent/prehydrate.toml").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.store.log);
    }

    #[test]
    fn test_server_file_gets_server_defaults() {
        let path = write_config(
            "server",
            r#"
env = "server"
bus_capacity = 0

[api.endpoints.categories]
path = "/api/v2/categories"

[logging]
format = "json"
"#,
        );
        let cfg = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(cfg.is_server());
        assert_eq!(cfg.api.base_url, "http://localhost:8132");
        assert!(!cfg.store.log);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.api.endpoint_path("categories"), "/api/v2/categories");
        assert_eq!(cfg.api.endpoint_path("users"), "/api/v1/users");
    }

    #[test]
    fn test_explicit_values_win_over_env_defaults() {
        let path = write_config(
            "explicit",
            r#"
env = "server"

[api]
base_url = "http://api.internal:9000"
token_header = ""
timeout_ms = 1500

[store]
log = true
"#,
        );
        let cfg = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.api.base_url, "http://api.internal:9000");
        assert_eq!(cfg.api.token_header(), None);
        assert_eq!(cfg.api.timeout(), Some(Duration::from_millis(1500)));
        assert!(cfg.store.log);
    }

    #[test]
    fn test_unknown_env_is_an_error() {
        let path = write_config("staging", "env = \"staging\"\n");
        let res = Config::from_file(&path);
        std::fs::remove_file(&path).ok();

        let Err(err) = res else {
            panic!("unknown env accepted");
        };
        assert!(!matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().contains("staging"), "{err}");
    }
}
