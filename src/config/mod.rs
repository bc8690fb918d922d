//! Configuration file loading and parsing.
//!
//! The configuration file is optional. It is searched in the following order:
//!
//! 1. Path specified via `--config` CLI flag (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.git-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.git-mcp\config.json`
//!
//! With no file, built-in defaults apply.

mod settings;

pub use settings::{Config, GitConfig, LoggingConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.git-mcp/`
/// - **Windows:** `%USERPROFILE%\.git-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".git-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location, falling
/// back to [`Config::default`] when no file exists there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - A field is invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
