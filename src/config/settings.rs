//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::jxa::executor::DEFAULT_INTERPRETER;

/// Longest per-call timeout accepted, in seconds.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Script execution settings.
    #[serde(default)]
    pub jxa: JxaConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        if self.jxa.interpreter.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "jxa.interpreter cannot be empty".to_string(),
            });
        }

        if !(1..=MAX_TIMEOUT_SECS).contains(&self.jxa.timeout_secs) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid jxa.timeout_secs {}. Must be between 1 and {MAX_TIMEOUT_SECS}",
                    self.jxa.timeout_secs
                ),
            });
        }

        Ok(())
    }
}

/// Script execution configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JxaConfig {
    /// Interpreter binary.
    /// Default: "osascript"
    #[serde(default = "default_interpreter")]
    pub interpreter: PathBuf,

    /// Deadline for a single tool call, in seconds.
    /// Default: 120
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl JxaConfig {
    /// Returns the per-call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for JxaConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_interpreter() -> PathBuf {
    PathBuf::from(DEFAULT_INTERPRETER)
}

const fn default_timeout_secs() -> u64 {
    120
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
