//! MCP server: session state, request dispatch and the serve loop.
//!
//! The server has two states. It starts uninitialised; a successful
//! `initialize` call moves it to initialised, where it stays. `tools/list`
//! and `tools/call` are refused with `-32002` until then.
//!
//! Every protocol, parameter, routing or handler failure becomes an error
//! response. Only a failure to read the input stream ends [`McpServer::serve`]
//! with an error.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;

use crate::error::TransportError;
use crate::mcp::protocol::{
    decode, decode_params, method, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, Response, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolCallResult, ToolDescriptor, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::{Arguments, ToolContext, ToolHandler};
use crate::mcp::transport::Transport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    Uninitialized,
    /// Ready for tool listing and invocation.
    Initialized,
}

/// The MCP server.
#[derive(Debug)]
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// Identity reported to the client.
    info: ServerInfo,
    /// Capabilities reported to the client.
    capabilities: ServerCapabilities,
    /// Registered tools.
    registry: ToolRegistry,
}

impl McpServer {
    /// Creates an uninitialised server with no tools.
    #[must_use]
    pub fn new(info: ServerInfo) -> Self {
        Self {
            state: ServerState::Uninitialized,
            info,
            capabilities: ServerCapabilities::default(),
            registry: ToolRegistry::new(),
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the identity reported to clients.
    #[must_use]
    pub const fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Registers a tool. A tool with the same name is replaced.
    pub fn register_tool(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) {
        tracing::debug!(tool = %descriptor.name, "Registering tool");
        self.registry.register(descriptor, handler);
    }

    /// Serves requests until end of stream or until `shutdown` turns `true`.
    ///
    /// Frames are handled strictly in order: each request is answered before
    /// the next line is read. A response that cannot be written is logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] if the input stream fails.
    pub async fn serve<R, W>(
        &mut self,
        transport: &mut Transport<R, W>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let ctx = ToolContext::new(shutdown.clone());
        let mut watching = true;
        tracing::info!(tools = self.registry.len(), "Serving MCP requests");

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping");
                return Ok(());
            }

            let frame = tokio::select! {
                biased;

                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        // Sender dropped without requesting shutdown.
                        watching = false;
                    }
                    continue;
                }

                frame = transport.read_frame() => frame?,
            };

            let Some(line) = frame else {
                tracing::info!("End of input stream, stopping");
                return Ok(());
            };

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let Some(response) = self.handle_frame(&ctx, &line).await else {
                continue;
            };

            if let Err(e) = transport.write_response(&response).await {
                tracing::error!(error = %e, id = ?response.id(), "Failed to emit response");
            }
        }
    }

    /// Handles one frame, returning the response to send, if any.
    ///
    /// Undecodable frames yield a parse error without an id. Notifications
    /// yield nothing.
    pub async fn handle_frame(&mut self, ctx: &ToolContext, frame: &[u8]) -> Option<Response> {
        let req: JsonRpcRequest = match decode(frame) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return Some(JsonRpcError::parse_error().into());
            }
        };

        if req.jsonrpc != JSONRPC_VERSION {
            tracing::warn!(jsonrpc = %req.jsonrpc, method = %req.method, "Unexpected jsonrpc version");
        }

        if req.is_notification() {
            tracing::debug!(method = %req.method, "Received notification");
            return None;
        }

        Some(self.handle_request(ctx, req).await)
    }

    /// Routes a request to its method handler.
    pub async fn handle_request(&mut self, ctx: &ToolContext, req: JsonRpcRequest) -> Response {
        tracing::debug!(id = ?req.id, method = %req.method, "Handling request");

        let result = match req.method.as_str() {
            method::INITIALIZE => self.handle_initialize(&req),
            method::TOOLS_LIST => self.handle_tools_list(&req),
            method::TOOLS_CALL => self.handle_tools_call(ctx, &req).await,
            _ => Err(JsonRpcError::method_not_found(req.id.clone())),
        };

        match result {
            Ok(resp) => resp.into(),
            Err(error) => {
                tracing::debug!(
                    id = ?req.id,
                    method = %req.method,
                    code = error.error.code,
                    message = %error.error.message,
                    "Request failed"
                );
                error.into()
            }
        }
    }

    /// Handles the initialize request.
    ///
    /// Repeating it is harmless: the state stays initialised and tools are kept.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: InitializeParams = decode_params(req.params.as_ref()).map_err(|e| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Invalid initialize params: {e}"))
        })?;

        tracing::info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            requested_version = %params.protocol_version,
            "Client initialised"
        );

        self.state = ServerState::Initialized;

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.info.clone(),
        };

        success(req.id.clone(), &result)
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialized(req.id.as_ref())?;

        let result = ListToolsResult {
            tools: self.registry.list(),
        };

        success(req.id.clone(), &result)
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        ctx: &ToolContext,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_initialized(req.id.as_ref())?;

        let params: ToolCallParams = decode_params(req.params.as_ref()).map_err(|e| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Invalid tool call params: {e}"))
        })?;

        let handler = self
            .registry
            .lookup(&params.name)
            .ok_or_else(|| JsonRpcError::unknown_tool(req.id.clone(), &params.name))?;

        let arguments = params.arguments.map(Arguments::from).unwrap_or_default();

        tracing::info!(tool = %params.name, "Calling tool");

        let content = handler.call(ctx, &arguments).await.map_err(|e| {
            tracing::warn!(tool = %params.name, error = %e, "Tool failed");
            JsonRpcError::internal_error(req.id.clone(), format!("Tool execution error: {e}"))
        })?;

        success(req.id.clone(), &ToolCallResult { content })
    }

    /// Ensures the server has been initialised.
    fn require_initialized(&self, id: Option<&RequestId>) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Initialized {
            return Err(JsonRpcError::not_initialized(id.cloned()));
        }
        Ok(())
    }
}

/// Builds a success response from a serialisable result.
fn success<T: Serialize>(id: Option<RequestId>, result: &T) -> Result<JsonRpcResponse, JsonRpcError> {
    let value = serde_json::to_value(result).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
    })?;

    Ok(JsonRpcResponse::success(id, value))
}
