//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! This module defines the wire records exchanged with the client and the
//! payload shapes of the three methods the server understands.
//!
//! # Message Types
//!
//! - **Request**: a message with a `method`; it expects a response when it carries an `id`
//! - **Notification**: a request without an `id`; no response is sent
//! - **Response**: exactly one of `result` or `error`, echoing the request `id`
//!
//! Decoding never maps failures to error codes itself. [`decode`] only reports
//! whether the bytes were not JSON at all ([`DecodeError::Syntax`]) or were
//! JSON of the wrong shape ([`DecodeError::Shape`]); the server picks the code.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mcp::tool::ToolContent;

/// The JSON-RPC version tag carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version this server advertises.
///
/// Not negotiated: the server answers with this value whatever the client asks for.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported in `serverInfo`.
pub const SERVER_NAME: &str = "git-mcp";

/// Method names routed by the server.
pub mod method {
    /// Initialisation handshake.
    pub const INITIALIZE: &str = "initialize";
    /// Tool listing.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Tool invocation.
    pub const TOOLS_CALL: &str = "tools/call";
}

/// Failure to produce a typed value from a JSON payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not syntactically valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The JSON is valid but does not have the expected shape.
    #[error("unexpected JSON shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match err.classify() {
            Category::Syntax | Category::Eof | Category::Io => Self::Syntax(err),
            Category::Data => Self::Shape(err),
        }
    }
}

/// Decodes a value of type `T` from raw JSON bytes.
///
/// # Errors
///
/// Returns [`DecodeError::Syntax`] for malformed JSON and [`DecodeError::Shape`]
/// for well-formed JSON that cannot be read as `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(bytes).map_err(DecodeError::from)
}

/// Decodes a value of type `T` from method parameters.
///
/// Absent parameters are decoded as JSON `null`, so types that require fields
/// fail with [`DecodeError::Shape`].
///
/// # Errors
///
/// Returns [`DecodeError::Shape`] if the parameters cannot be read as `T`.
pub fn decode_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T, DecodeError> {
    let value = params.cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(DecodeError::from)
}

/// A JSON-RPC 2.0 request ID.
///
/// Opaque to the server: whatever the client sent is echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(serde_json::Number),
    /// String request ID.
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// A request without an `id` is a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Should be "2.0".
    #[serde(default)]
    pub jsonrpc: String,

    /// Request identifier, absent for notifications.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The method to invoke. Empty if absent, which no route matches.
    #[serde(default)]
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns `true` if no response is expected.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Standard JSON-RPC 2.0 error codes, plus the server-defined ones MCP uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The method does not exist, or the named tool is not registered.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal error, including tool execution failures.
    InternalError,
    /// A method that needs a completed handshake was called before `initialize`.
    NotInitialized,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::NotInitialized => -32002,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::NotInitialized => "Server not initialized",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,

    /// The request ID this response corresponds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: String,

    /// The request ID this error corresponds to (if known).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates a "Server not initialized" error response.
    #[must_use]
    pub fn not_initialized(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::NotInitialized))
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::MethodNotFound))
    }

    /// Creates the error returned when `tools/call` names an unregistered tool.
    #[must_use]
    pub fn unknown_tool(id: Option<RequestId>, name: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::MethodNotFound, format!("Unknown tool: {name}")),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, message),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(ErrorCode::InternalError, message),
        )
    }
}

/// Any response the server emits: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// A successful response.
    Success(JsonRpcResponse),
    /// An error response.
    Error(JsonRpcError),
}

impl Response {
    /// Returns the request ID this response answers, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Success(resp) => resp.id.as_ref(),
            Self::Error(err) => err.id.as_ref(),
        }
    }

    /// Returns the error object if this is an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Success(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }

    /// Returns the result value if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Success(resp) => Some(&resp.result),
            Self::Error(_) => None,
        }
    }
}

impl From<JsonRpcResponse> for Response {
    fn from(resp: JsonRpcResponse) -> Self {
        Self::Success(resp)
    }
}

impl From<JsonRpcError> for Response {
    fn from(err: JsonRpcError) -> Self {
        Self::Error(err)
    }
}

// =============================================================================
// Method payloads
// =============================================================================

/// Roots capability announced by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    /// Whether the client notifies about root list changes.
    #[serde(default, skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Capabilities announced by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Roots support.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
}

/// Client information received during initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Client information.
    pub client_info: ClientInfo,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(default, skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Server identity reported in the initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Creates server information from a name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
    }
}

/// Result of the initialize request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The protocol version the server speaks.
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: ServerInfo,
}

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Creates a tool descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Result of the tools/list request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Every registered tool, in registration order.
    pub tools: Vec<ToolDescriptor>,
}

/// Parameters for the tools/call request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// Result of the tools/call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
const fn is_false(b: &bool) -> bool {
    !*b
}
