//! Error types for git-mcp.
//!
//! Tool and protocol failures never stop the server: they become JSON-RPC
//! error responses. Only [`TransportError::Read`] is fatal to the serve loop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors a tool handler can report.
///
/// The `Display` text is what the client sees after `Tool execution error: `.
#[derive(Error, Debug)]
pub enum ToolError {
    /// An argument is missing or unusable.
    #[error("argument '{name}' {reason}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Git {
        /// The git arguments that were run.
        command: String,
        /// Trimmed standard error (or standard output if stderr was empty).
        stderr: String,
    },

    /// The git binary could not be started.
    #[error("failed to run {binary}: {source}")]
    Spawn {
        /// The binary that was run.
        binary: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The server is shutting down.
    #[error("cancelled")]
    Cancelled,

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Creates a [`ToolError::Failed`] from a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Creates a [`ToolError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while moving frames over the byte streams.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Reading the input stream failed. Fatal.
    #[error("failed to read from input stream")]
    Read(#[source] std::io::Error),

    /// Writing a frame failed.
    #[error("failed to write to output stream")]
    Write(#[source] std::io::Error),

    /// A response could not be serialised.
    #[error("failed to serialise response")]
    Serialise(#[source] serde_json::Error),
}
