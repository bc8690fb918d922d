//! The tool handler capability and the values that flow through it.
//!
//! A handler receives a [`ToolContext`] (carrying the server's shutdown signal)
//! and the call's [`Arguments`], and produces [`ToolContent`] blocks or a
//! [`ToolError`]. The server never looks inside a handler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::ToolError;

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ToolContent {
    /// Creates a text content block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Execution context passed to every handler invocation.
///
/// Cancellation is cooperative: handlers check [`is_cancelled`](Self::is_cancelled)
/// or race their work against [`cancelled`](Self::cancelled).
#[derive(Debug, Clone)]
pub struct ToolContext {
    shutdown: watch::Receiver<bool>,
}

impl ToolContext {
    /// Creates a context observing the given shutdown signal.
    #[must_use]
    pub const fn new(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown }
    }

    /// Creates a context that is never cancelled.
    #[must_use]
    pub fn detached() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(rx)
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Completes when shutdown is requested.
    ///
    /// Never completes if the shutdown sender is dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.shutdown.clone();
        let fired = rx.wait_for(|stop| *stop).await.is_ok();
        if !fired {
            std::future::pending::<()>().await;
        }
    }
}

/// Arguments of a tool call: a JSON object keyed by argument name.
///
/// The accessors are total: a missing or mistyped value yields the default
/// rather than an error, so handlers decide which arguments are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Creates an empty argument map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the string value for `key`, treating an empty string as absent.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Returns the string value for `key`, or `default`.
    #[must_use]
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.str(key).unwrap_or(default).to_string()
    }

    /// Returns the integer value for `key`, or `default`.
    ///
    /// Floating-point values are truncated.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            _ => default,
        }
    }

    /// Returns the boolean value for `key`, or `default`.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Returns the string elements of the array at `key`.
    ///
    /// Non-string elements are skipped; a missing or non-array value is empty.
    #[must_use]
    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the string value for `key`, failing if it is missing or empty.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] if the argument is absent.
    pub fn required_str(&self, key: &str) -> Result<&str, ToolError> {
        self.str(key).ok_or_else(|| ToolError::InvalidArgument {
            name: key.to_string(),
            reason: "is required".to_string(),
        })
    }

    /// Returns `true` if no arguments were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A capability bound to a tool name.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] describing why the tool failed. The server turns
    /// it into a `-32603` response carrying the error's message.
    async fn call(&self, ctx: &ToolContext, args: &Arguments)
        -> Result<Vec<ToolContent>, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_content_serialises_with_type_tag() {
        let value = serde_json::to_value(ToolContent::text("hello")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn string_accessors() {
        let a = args(json!({"repo_path": "/tmp/repo", "empty": "", "num": 3}));
        assert_eq!(a.str("repo_path"), Some("/tmp/repo"));
        assert_eq!(a.str("empty"), None);
        assert_eq!(a.str("num"), None);
        assert_eq!(a.string_or("missing", "origin"), "origin");
        assert!(a.required_str("missing").is_err());
        assert_eq!(a.required_str("repo_path").unwrap(), "/tmp/repo");
    }

    #[test]
    fn int_accessor_accepts_floats_and_defaults() {
        let a = args(json!({"max_count": 5, "context_lines": 2.0, "bad": "7"}));
        assert_eq!(a.int_or("max_count", 10), 5);
        assert_eq!(a.int_or("context_lines", 3), 2);
        assert_eq!(a.int_or("bad", 3), 3);
        assert_eq!(a.int_or("missing", 3), 3);
    }

    #[test]
    fn bool_accessor() {
        let a = args(json!({"bare": true, "tags": "yes"}));
        assert!(a.bool_or("bare", false));
        assert!(!a.bool_or("tags", false));
        assert!(a.bool_or("annotated", true));
    }

    #[test]
    fn string_list_skips_non_strings() {
        let a = args(json!({"files": ["a.txt", 1, "b.txt", null], "scalar": "x"}));
        assert_eq!(a.string_list("files"), vec!["a.txt", "b.txt"]);
        assert!(a.string_list("scalar").is_empty());
        assert!(a.string_list("missing").is_empty());
    }

    #[tokio::test]
    async fn context_observes_shutdown() {
        let (tx, rx) = watch::channel(false);
        let ctx = ToolContext::new(rx);
        assert!(!ctx.is_cancelled());

        tx.send(true).unwrap();
        assert!(ctx.is_cancelled());
        ctx.cancelled().await;
    }

    #[test]
    fn detached_context_is_never_cancelled() {
        assert!(!ToolContext::detached().is_cancelled());
    }
}
