//! Server configuration
//!
//! Typed configuration with defaults, JSON5 file loading, and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Bind address for the HTTP/WebSocket listener.
    pub bind: String,
    /// Listener port.
    pub port: u16,
    /// Time limit applied when a poll is created without one, in seconds.
    pub default_time_limit_secs: u64,
    /// Outbound event queue depth per connection.
    pub queue_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3001,
            default_time_limit_secs: 60,
            queue_size: 100,
        }
    }
}

impl ServerConfig {
    /// Load from a JSON5 file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_time_limit_secs == 0 {
            return Err(ConfigError::Invalid(
                "defaultTimeLimitSecs must be at least 1".to_string(),
            ));
        }
        if self.queue_size == 0 {
            return Err(ConfigError::Invalid(
                "queueSize must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
