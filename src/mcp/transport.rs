//! stdio transport for MCP server.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: used for logging (never MCP messages)
//!
//! stdin is read on its own task so the server can keep answering while a
//! tool call runs. Writes happen on the server task, one message at a time.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};

/// A stdio-based MCP transport.
///
/// Handles reading JSON-RPC messages from stdin and writing responses to stdout.
pub struct StdioTransport {
    /// Lines read from stdin by the reader task, once it is started.
    incoming: Option<mpsc::Receiver<io::Result<String>>>,
    /// Handle for stdout.
    writer: tokio::io::Stdout,
}

/// Lines buffered between the reader task and the server.
const INCOMING_CAPACITY: usize = 32;

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            incoming: None,
            writer: tokio::io::stdout(),
        }
    }

    /// Reads the next message line from stdin.
    ///
    /// The first call starts the reader task. Returns `None` if stdin is
    /// closed (EOF). Cancel safe: no line is lost when this future is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from stdin fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let incoming = self.incoming.get_or_insert_with(|| {
            let (tx, rx) = mpsc::channel(INCOMING_CAPACITY);
            tokio::spawn(forward_lines(BufReader::new(tokio::io::stdin()), tx));
            rx
        });
        incoming.recv().await.transpose()
    }

    /// Writes a JSON-RPC response to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_message(response).await
    }

    /// Writes a JSON-RPC error to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_message(error).await
    }

    /// Serialises `message` as a single line and flushes it.
    async fn write_message<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        let json = encode_line(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends each line of `reader` to `tx` until EOF, a read error or a closed
/// channel.
async fn forward_lines<R>(mut reader: R, tx: mpsc::Sender<io::Result<String>>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut line = String::new();
        let item = match reader.read_line(&mut line).await {
            Ok(0) => return,
            Ok(_) => Ok(strip_line_ending(line)),
            Err(e) => Err(e),
        };
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            return;
        }
    }
}

/// Removes a trailing `\n` or `\r\n`.
fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// Serialises a message as compact JSON terminated by a newline.
fn encode_line<T: Serialize>(message: &T) -> io::Result<String> {
    let mut json =
        serde_json::to_string(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    // Compact serde_json output escapes newlines inside strings.
    debug_assert!(
        !json.contains('\n'),
        "JSON message must not contain embedded newlines"
    );

    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;

    #[test]
    fn transport_default() {
        let _transport = StdioTransport::default();
    }

    #[tokio::test]
    async fn forwards_lines_until_eof() {
        let (tx, mut rx) = mpsc::channel(4);
        forward_lines(b"{\"a\":1}\r\n\n{\"b\":2}".as_slice(), tx).await;

        assert_eq!(rx.recv().await.unwrap().unwrap(), r#"{"a":1}"#);
        assert_eq!(rx.recv().await.unwrap().unwrap(), "");
        assert_eq!(rx.recv().await.unwrap().unwrap(), r#"{"b":2}"#);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn forwarding_stops_when_server_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Returns instead of reading the rest of the input.
        forward_lines(b"one\ntwo\n".as_slice(), tx).await;
    }

    #[test]
    fn strips_line_endings() {
        assert_eq!(strip_line_ending("{}\n".to_string()), "{}");
        assert_eq!(strip_line_ending("{}\r\n".to_string()), "{}");
        assert_eq!(strip_line_ending("{}".to_string()), "{}");
    }

    #[test]
    fn encoded_response_is_one_line() {
        // Multi-line text content, as produced by pretty-printed tool results.
        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({
                "content": [{"type": "text", "text": "{\n  \"count\": 2\n}"}],
            }),
        );

        let line = encode_line(&response).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn encoded_error_is_one_line() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "test/method");

        let line = encode_line(&error).unwrap();
        assert_eq!(line.matches('\n').count(), 1);
    }
}
