//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` fmt subscriber driven by `LoggingConfig`.
//! `RUST_LOG` takes precedence over the configured level when it is set.

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Build the filter: `RUST_LOG` if present, otherwise the configured level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()))
}

/// Install the global subscriber.
///
/// Returns an error if another subscriber is already installed, so callers that
/// may initialize twice (tests, embedding apps) can ignore it.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;
    debug!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
