//! # `tracing` setup.
//!
//! Library code only emits `tracing` records; applications that want them on
//! stdout call [`init_tracing`] once at startup (or install their own subscriber).
//!
//! `RUST_LOG`, when set, overrides [`LoggingConfig::level`].

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global `tracing` subscriber described by `cfg`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let registry = tracing_subscriber::registry().with(filter);

    match cfg.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
    }
}
