//! Configuration module for telnetd.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, TelnetError};

/// Configuration shared by both listeners (host, port, and connection limits).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number for the character-mode server.
    #[serde(default = "default_char_port")]
    pub char_port: u16,
    /// Port number for the line-mode binary server.
    #[serde(default = "default_line_port")]
    pub line_port: u16,
    /// Maximum number of concurrent connections, per listener.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Idle timeout in seconds. Reserved; not actively enforced.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Interval in seconds between timestamp emissions.
    #[serde(default = "default_timestamp_interval")]
    pub timestamp_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_char_port() -> u16 {
    9092
}

fn default_line_port() -> u16 {
    9093
}

fn default_max_connections() -> usize {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_timestamp_interval() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            char_port: default_char_port(),
            line_port: default_line_port(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
            timestamp_interval_secs: default_timestamp_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/telnetd.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration shared by both listeners.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(TelnetError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TelnetError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TELNETD_LOG_LEVEL`: override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("TELNETD_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the two servers would bind the same host/port pair.
    pub fn validate(&self) -> Result<()> {
        if self.server.char_port == self.server.line_port {
            return Err(TelnetError::Config(format!(
                "char_port and line_port must differ (both set to {})",
                self.server.char_port
            )));
        }
        Ok(())
    }
}
