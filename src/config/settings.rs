//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::git::Identity;

/// Log levels accepted in `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

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

    /// Repository used when a tool call omits `repo_path`.
    #[serde(default)]
    pub repository: Option<PathBuf>,

    /// Git settings.
    #[serde(default)]
    pub git: GitConfig,

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
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if self.git.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "git.binary must not be empty".to_string(),
            });
        }

        if let Some(ref email) = self.git.user_email {
            if !email.contains('@') {
                return Err(ConfigError::ValidationError {
                    message: format!("Invalid git.user_email '{email}'"),
                });
            }
        }

        Ok(())
    }
}

/// Git configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitConfig {
    /// Git executable. Default: "git"
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Name recorded on commits and annotated tags.
    #[serde(default)]
    pub user_name: Option<String>,

    /// Email recorded on commits and annotated tags.
    #[serde(default)]
    pub user_email: Option<String>,
}

impl GitConfig {
    /// Returns the commit identity, filling unset parts from the default identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        let default = Identity::default();
        Identity {
            name: self.user_name.clone().unwrap_or(default.name),
            email: self.user_email.clone().unwrap_or(default.email),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            user_name: None,
            user_email: None,
        }
    }
}

fn default_binary() -> String {
    "git".to_string()
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
