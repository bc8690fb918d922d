//! Line-delimited transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The transport is generic over its streams so the same framing runs against
//! in-memory buffers in tests.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::TransportError;
use crate::mcp::protocol::Response;

/// Transport over the process's stdin and stdout.
pub type StdioTransport = Transport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

/// Reads newline-delimited frames and writes newline-terminated responses.
///
/// Bytes of a partly read line are kept across calls, so an interrupted
/// [`read_frame`](Self::read_frame) resumes where it stopped.
pub struct Transport<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl StdioTransport {
    /// Creates a transport over stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Transport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given streams.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Reads the next frame as raw bytes.
    ///
    /// Returns `None` at end of stream. The trailing newline (and `\r`) is removed.
    /// The bytes are not checked for UTF-8; that is left to the decoder.
    ///
    /// Cancel safe: if the returned future is dropped, the bytes read so far
    /// stay buffered for the next call.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Read`] if reading fails.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(TransportError::Read)?;

        if bytes_read == 0 && self.line.is_empty() {
            return Ok(None);
        }

        let mut frame = std::mem::take(&mut self.line);
        if frame.last() == Some(&b'\n') {
            frame.pop();
            if frame.last() == Some(&b'\r') {
                frame.pop();
            }
        }

        Ok(Some(frame))
    }

    /// Serialises a response and writes it as one newline-terminated frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialise`] or [`TransportError::Write`].
    pub async fn write_response(&mut self, response: &Response) -> Result<(), TransportError> {
        let json = serde_json::to_string(response).map_err(TransportError::Serialise)?;
        self.write_raw(&json).await
    }

    async fn write_raw(&mut self, json: &str) -> Result<(), TransportError> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let mut frame = Vec::with_capacity(json.len() + 1);
        frame.extend_from_slice(json.as_bytes());
        frame.push(b'\n');

        self.writer
            .write_all(&frame)
            .await
            .map_err(TransportError::Write)?;
        self.writer.flush().await.map_err(TransportError::Write)
    }

    /// Consumes the transport, returning its streams.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse, RequestId};

    #[tokio::test]
    async fn read_frames_until_eof() {
        let input: &[u8] = b"{\"a\":1}\r\n\n{\"b\":2}";
        let mut transport = Transport::new(input, Vec::new());

        assert_eq!(transport.read_frame().await.unwrap().as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(transport.read_frame().await.unwrap().as_deref(), Some(&b""[..]));
        assert_eq!(transport.read_frame().await.unwrap().as_deref(), Some(&b"{\"b\":2}"[..]));
        assert_eq!(transport.read_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_returned_not_an_error() {
        let input: &[u8] = b"{\"m\":\"x\xff\"}\nnext\n";
        let mut transport = Transport::new(input, Vec::new());

        assert_eq!(
            transport.read_frame().await.unwrap().as_deref(),
            Some(&b"{\"m\":\"x\xff\"}"[..])
        );
        assert_eq!(transport.read_frame().await.unwrap().as_deref(), Some(&b"next"[..]));
    }

    #[tokio::test]
    async fn interrupted_read_keeps_partial_line() {
        let (mut client, server_side) = tokio::io::duplex(64);
        let mut transport = Transport::new(BufReader::new(server_side), Vec::new());

        client.write_all(b"{\"jsonrpc\":").await.unwrap();
        let interrupted = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            transport.read_frame(),
        )
        .await;
        assert!(interrupted.is_err());

        client.write_all(b"\"2.0\"}\n").await.unwrap();
        assert_eq!(
            transport.read_frame().await.unwrap().as_deref(),
            Some(&b"{\"jsonrpc\":\"2.0\"}"[..])
        );
    }

    #[tokio::test]
    async fn read_error_is_reported() {
        let reader = tokio_test::io::Builder::new()
            .read_error(std::io::Error::other("stream broke"))
            .build();
        let mut transport = Transport::new(BufReader::new(reader), Vec::new());

        let err = transport.read_frame().await.unwrap_err();
        assert!(matches!(err, TransportError::Read(_)));
    }

    #[tokio::test]
    async fn write_response_appends_single_newline() {
        let mut transport = Transport::new(&b""[..], Vec::new());
        let response = JsonRpcResponse::success(
            Some(RequestId::from(1)),
            serde_json::json!({
                "message": "hello\nworld",
                "nested": {"key": "value"}
            }),
        );

        transport.write_response(&response.into()).await.unwrap();
        transport
            .write_response(&JsonRpcError::parse_error().into())
            .await
            .unwrap();

        let (_, written) = transport.into_inner();
        let text = String::from_utf8(written).unwrap();
        let lines: Vec<_> = text.split_terminator('\n').collect();
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));
        assert!(lines[0].contains(r#""message":"hello\nworld""#));
        assert_eq!(
            lines[1],
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error"}}"#
        );
    }
}
