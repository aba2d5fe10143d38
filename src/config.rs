//! # Configuration Management
//!
//! Centralized configuration for the transfer client.
//!
//! This module holds the protocol constants shared with the server and the
//! runtime knobs of the client: where the server lives, how long each
//! round-trip may take, how many checksum retries are allowed and how logs are
//! emitted.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Environment overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Version byte carried in every request header
pub const PROTOCOL_VERSION: u8 = 3;

/// Size of one transport frame; every write and read moves exactly this many bytes
pub const FRAME_SIZE: usize = 1024;

/// Additional upload attempts after the first checksum mismatch
pub const DEFAULT_MAX_CRC_RETRIES: u32 = 3;

/// Port used when no server address is configured
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:1234";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TransferConfig {
    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TransferConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `SECURE_TRANSFER_*` overrides resolved through `lookup`.
    ///
    /// A variable that is present but does not parse is an error.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("SECURE_TRANSFER_SERVER_ADDRESS") {
            config.client.address = addr;
        }
        if let Some(ms) = env_value::<u64>(&lookup, "SECURE_TRANSFER_CONNECTION_TIMEOUT_MS")? {
            config.client.connection_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value::<u64>(&lookup, "SECURE_TRANSFER_OPERATION_TIMEOUT_MS")? {
            config.client.operation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_value::<u64>(&lookup, "SECURE_TRANSFER_RESPONSE_TIMEOUT_MS")? {
            config.client.response_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = env_value::<u32>(&lookup, "SECURE_TRANSFER_MAX_CRC_RETRIES")? {
            config.client.max_crc_retries = retries;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Validate the configuration.
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_value<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ProtocolError::ConfigError(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target server address (`host:port`)
    pub address: String,

    /// Timeout for each connection attempt
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Timeout for sending one logical request
    #[serde(with = "duration_serde")]
    pub operation_timeout: Duration,

    /// Timeout for waiting on one logical response
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Upload attempts allowed after the first checksum mismatch
    pub max_crc_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from(DEFAULT_SERVER_ADDRESS),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            operation_timeout: timeout::OPERATION_TIMEOUT,
            response_timeout: timeout::RESPONSE_TIMEOUT,
            max_crc_retries: DEFAULT_MAX_CRC_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else {
            match self.address.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
                _ => errors.push(format!(
                    "Invalid server address format: '{}' (expected format: 'host:port')",
                    self.address
                )),
            }
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        if self.operation_timeout.as_millis() < 10 {
            errors.push("Operation timeout too short (minimum: 10ms)".to_string());
        }

        if self.response_timeout.as_millis() < 100 {
            errors.push("Response timeout too short (minimum: 100ms)".to_string());
        }

        if self.max_crc_retries > 10 {
            errors.push(format!(
                "Too many checksum retries: {} (maximum: 10)",
                self.max_crc_retries
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name attached to log lines
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("secure-transfer"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
