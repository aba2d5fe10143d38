//! Logging setup.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the embedding application, which can call [`init_logging`] with the
//! [`LoggingConfig`] section of its configuration.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `tracing-subscriber` fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to the
/// whole process. Fails if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| {
        ProtocolError::ConfigError(format!(
            "Failed to install subscriber for {}: {e}",
            config.app_name
        ))
    })?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
