//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the part of the MCP specification needed to expose
//! a fixed set of tools to AI assistants. The server communicates over stdio
//! transport using newline-delimited JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│  Registry   │    │
//! │   │   (stdio)   │    │ (dispatch)  │    │  (handlers) │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐      │
//! │   │              JSON-RPC Messages                  │      │
//! │   └─────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod tool;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, Response, ToolDescriptor, MCP_PROTOCOL_VERSION,
};
pub use registry::ToolRegistry;
pub use server::McpServer;
pub use tool::{Arguments, ToolContent, ToolContext, ToolHandler};
pub use transport::{StdioTransport, Transport};
