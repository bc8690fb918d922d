//! git-mcp: MCP server exposing git repository operations as tools
//!
//! This library provides a small Model Context Protocol server core and the
//! git tools registered on it.
//!
//! # Architecture
//!
//! The MCP core knows nothing about git:
//!
//! - **Envelope**: JSON-RPC 2.0 requests, responses and error objects
//! - **Registry**: tool descriptors bound to handlers, in registration order
//! - **Dispatcher**: `initialize`, `tools/list`, `tools/call`, with the
//!   initialisation gate
//! - **Transport**: newline-delimited frames over any async reader/writer
//!
//! The git tools are plain [`mcp::ToolHandler`] implementations registered by
//! the binary.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`git`]: Git operations and their tool bindings
//! - [`mcp`]: MCP protocol implementation

pub mod config;
pub mod error;
pub mod git;
pub mod mcp;
