//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`APPIUM_SESSION_*`)
//! - CLI arguments (for the `appium-session` binary)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::payload::DEFAULT_SPILL_THRESHOLD;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server connection configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Payload handling configuration
    #[serde(default)]
    pub payload: PayloadConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SessionError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| SessionError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load the default config file when one exists, then overlay
    /// environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Default config file location, platform dependent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("appium-session").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("APPIUM_SESSION_SERVER_URL") {
            self.server.url = url;
        }
        if let Ok(secs) = std::env::var("APPIUM_SESSION_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.server.connect_timeout_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("APPIUM_SESSION_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                self.server.request_timeout_secs = secs;
            }
        }
        if let Ok(bytes) = std::env::var("APPIUM_SESSION_SPILL_THRESHOLD_BYTES") {
            if let Ok(bytes) = bytes.parse() {
                self.payload.spill_threshold_bytes = bytes;
            }
        }
    }
}

/// Server connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server base URL (e.g., http://127.0.0.1:4723)
    pub url: String,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4723".to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Payload handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadConfig {
    /// Bytes a payload may occupy in memory before spilling to disk
    pub spill_threshold_bytes: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            spill_threshold_bytes: DEFAULT_SPILL_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://127.0.0.1:4723");
        assert_eq!(config.server.connect_timeout_secs, 30);
        assert_eq!(config.server.request_timeout_secs, 120);
        assert_eq!(config.payload.spill_threshold_bytes, 4 * 1024 * 1024);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [server]
            url = "http://device-farm.internal:4444/wd/hub"
            connect_timeout_secs = 5
            request_timeout_secs = 300

            [payload]
            spill_threshold_bytes = 1048576
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.url, "http://device-farm.internal:4444/wd/hub");
        assert_eq!(config.server.connect_timeout_secs, 5);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.payload.spill_threshold_bytes, 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            [server]
            url = "http://10.0.0.5:4723"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.url, "http://10.0.0.5:4723");
        assert_eq!(config.server.request_timeout_secs, 120);
        assert_eq!(config.payload.spill_threshold_bytes, 4 * 1024 * 1024);
    }

    #[test]
    fn test_timeout_durations() {
        let server = ServerConfig::default();
        assert_eq!(server.connect_timeout(), Duration::from_secs(30));
        assert_eq!(server.request_timeout(), Duration::from_secs(120));
    }
}
