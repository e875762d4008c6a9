//! MCP server implementation for Apple Mail automation.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! # Architecture
//!
//! The server owns the protocol state machine only. Tool calls are handed to
//! [`MailTools`], which runs one JXA script per call. Each call runs on its
//! own task, so the server keeps reading stdin and answering `ping` while a
//! script runs.
//!
//! Every tool call gets a child of the shutdown token. SIGINT/SIGTERM cancels
//! the shutdown token and with it every in-flight script. A client's
//! `notifications/cancelled` cancels only the named call, and no result is
//! sent for it.

use std::collections::HashMap;
use std::future::Future;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::mcp::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::StdioTransport;
use crate::tools::{tool_definitions, MailTools};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Behaviour hints attached to a tool definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)] // mirrors the MCP annotation object
pub struct ToolAnnotations {
    /// Human-readable title.
    pub title: String,
    /// The tool does not modify Mail.app state.
    pub read_only_hint: bool,
    /// The tool may destroy existing data.
    pub destructive_hint: bool,
    /// Repeating a call has no further effect.
    pub idempotent_hint: bool,
    /// The tool talks to an external system.
    pub open_world_hint: bool,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// Behaviour hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for the notifications/cancelled notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    /// ID of the request to cancel.
    pub request_id: RequestId,
    /// Optional reason given by the client.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates a successful result holding pretty-printed JSON.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// A tool call whose script has finished, reported back to the server loop.
struct FinishedCall {
    /// ID of the `tools/call` request.
    id: RequestId,
    /// Token the call ran under.
    cancel: CancellationToken,
    /// Response to send, unless the call was cancelled.
    response: Result<JsonRpcResponse, JsonRpcError>,
}

/// The MCP server for Apple Mail automation.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: StdioTransport,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// The Mail.app tools.
    tools: MailTools,
    /// Cancelled when the server shuts down.
    shutdown: CancellationToken,
    /// Tool calls still running, by request ID.
    in_flight: HashMap<RequestId, CancellationToken>,
    /// Handed to each tool call task.
    finished_tx: mpsc::UnboundedSender<FinishedCall>,
    /// Drained by the server loop.
    finished_rx: mpsc::UnboundedReceiver<FinishedCall>,
}

impl McpServer {
    /// Creates a new MCP server serving the given tools.
    #[must_use]
    pub fn new(tools: MailTools) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            protocol_version: None,
            tools,
            shutdown: CancellationToken::new(),
            in_flight: HashMap::new(),
            finished_tx,
            finished_rx,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the token cancelled on shutdown.
    #[must_use]
    pub const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// Returns once a shutdown signal arrives, or once stdin is closed and
    /// every in-flight tool call has answered.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed or transport
    /// I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        let signal = shutdown_signal()?;
        let trigger = self.shutdown.clone();
        tokio::spawn(async move {
            let name = signal.await;
            tracing::info!("Received {name}, initiating graceful shutdown");
            trigger.cancel();
        });

        let shutdown = self.shutdown.clone();
        let mut reading = true;
        while reading || !self.in_flight.is_empty() {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                Some(finished) = self.finished_rx.recv() => {
                    self.finish_tool_call(finished).await?;
                }

                line_result = self.transport.read_line(), if reading => {
                    reading = self.handle_transport_result(line_result).await?;
                }
            }
        }

        self.state = ServerState::ShuttingDown;
        self.shutdown.cancel();
        Ok(())
    }

    /// Handles the result from transport read.
    ///
    /// Returns `false` once stdin is closed.
    async fn handle_transport_result(
        &mut self,
        line_result: io::Result<Option<String>>,
    ) -> io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!(in_flight = self.in_flight.len(), "stdin closed, shutting down");
            return Ok(false);
        };

        if !line.trim().is_empty() {
            self.handle_line(&line).await?;
        }

        Ok(true)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> io::Result<()> {
        use crate::mcp::protocol::parse_message;

        match parse_message(line) {
            Ok(msg) => {
                tracing::trace!(method = msg.method(), "Parsed message");
                self.handle_message(msg).await
            }
            Err(error) => {
                tracing::debug!(line, "Rejected malformed message");
                self.transport.write_error(&error).await?;
                Ok(())
            }
        }
    }

    /// Handles a parsed incoming message.
    async fn handle_message(&mut self, msg: IncomingMessage) -> io::Result<()> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
        }
    }

    /// Handles an incoming request.
    ///
    /// `tools/call` is answered later, from [`Self::finish_tool_call`].
    async fn handle_request(&mut self, req: JsonRpcRequest) -> io::Result<()> {
        tracing::debug!(id = %req.id, method = %req.method, params = ?req.params, "MCP request");

        if req.method == "tools/call" {
            return match self.start_tool_call(&req) {
                Ok(()) => Ok(()),
                Err(error) => self.respond(&req.id, Err(error)).await,
            };
        }

        let response = self.dispatch(&req);
        self.respond(&req.id, response).await
    }

    /// Writes a response or error for the request `id`.
    async fn respond(
        &mut self,
        id: &RequestId,
        response: Result<JsonRpcResponse, JsonRpcError>,
    ) -> io::Result<()> {
        match response {
            Ok(resp) => {
                tracing::debug!(id = %resp.id, result = %resp.result, "MCP response");
                self.transport.write_response(&resp).await
            }
            Err(error) => {
                tracing::debug!(id = %id, error = %error.error.message, "MCP error response");
                self.transport.write_error(&error).await
            }
        }
    }

    /// Routes a request that is answered immediately to its handler.
    fn dispatch(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "ping" => Ok(Self::handle_ping(req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        tracing::debug!(method = %notif.method, "MCP notification");
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                self.state = ServerState::Running;
                tracing::info!(
                    protocol_version = self.protocol_version.as_deref().unwrap_or_default(),
                    "Client initialised"
                );
            }
            "notifications/cancelled" => self.cancel_tool_call(notif.params.as_ref()),
            _ => {}
        }
    }

    /// Cancels the in-flight tool call named by a cancellation notification.
    fn cancel_tool_call(&mut self, params: Option<&Value>) {
        let params: CancelledParams = match params.map(|p| serde_json::from_value(p.clone())) {
            Some(Ok(params)) => params,
            _ => {
                tracing::debug!(params = ?params, "Ignoring cancellation without a request ID");
                return;
            }
        };

        match self.in_flight.remove(&params.request_id) {
            Some(cancel) => {
                cancel.cancel();
                tracing::info!(
                    id = %params.request_id,
                    reason = params.reason.as_deref().unwrap_or("none"),
                    "Tool call cancelled by client"
                );
            }
            None => {
                tracing::debug!(id = %params.request_id, "Cancellation for unknown or finished request");
            }
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                requested_version = %params.protocol_version,
                "Initialize request"
            );
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": tool_definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Starts a tools/call request on its own task.
    fn start_tool_call(&mut self, req: &JsonRpcRequest) -> Result<(), JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        if self.in_flight.contains_key(&req.id) {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Request ID already in use by a running tool call",
                ),
            ));
        }

        let cancel = self.shutdown.child_token();
        self.in_flight.insert(req.id.clone(), cancel.clone());

        let tools = self.tools.clone();
        let id = req.id.clone();
        let finished = self.finished_tx.clone();
        tokio::spawn(async move {
            let response = call_tool(&tools, &id, &params, &cancel).await;
            // A closed channel means the server loop has already returned.
            let _ = finished.send(FinishedCall {
                id,
                cancel,
                response,
            });
        });

        Ok(())
    }

    /// Sends the result of a finished tool call, unless it was cancelled.
    async fn finish_tool_call(&mut self, finished: FinishedCall) -> io::Result<()> {
        if finished.cancel.is_cancelled() {
            tracing::debug!(id = %finished.id, "Dropping result of cancelled tool call");
            return Ok(());
        }

        self.in_flight.remove(&finished.id);
        self.respond(&finished.id, finished.response).await
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::not_initialised(id.clone()));
        }
        Ok(())
    }
}

/// Runs one tool call and wraps its result in a response.
async fn call_tool(
    tools: &MailTools,
    id: &RequestId,
    params: &ToolCallParams,
    cancel: &CancellationToken,
) -> Result<JsonRpcResponse, JsonRpcError> {
    let result = tools.call(&params.name, &params.arguments, cancel).await;

    let result_value = serde_json::to_value(&result).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise tool call result");
        JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
    })?;

    Ok(JsonRpcResponse::success(id.clone(), result_value))
}

/// Resolves with the name of the first shutdown signal received.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    })
}

/// Resolves with the name of the first shutdown signal received.
#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::jxa::Executor;

    fn server() -> McpServer {
        let tools = MailTools::new(
            Executor::with_interpreter("/nonexistent/osascript"),
            Duration::from_secs(5),
        );
        McpServer::new(tools)
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: RequestId::Number(id),
            method: method.to_string(),
            params,
        }
    }

    fn notification(method: &str, params: Option<Value>) -> JsonRpcNotification {
        JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        }
    }

    fn initialised_server() -> McpServer {
        let mut server = server();
        let init = request(
            1,
            "initialize",
            Some(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0.0"}
            })),
        );
        server.handle_initialize(&init).unwrap();
        server.handle_notification(&notification("notifications/initialized", None));
        server
    }

    #[test]
    fn server_initial_state() {
        let server = server();
        assert_eq!(server.state(), ServerState::AwaitingInit);
        assert!(!server.shutdown_token().is_cancelled());
    }

    #[test]
    fn initialize_negotiates_version() {
        let mut server = server();
        let init = request(1, "initialize", Some(json!({"protocolVersion": "2024-11-05"})));
        let response = server.handle_initialize(&init).unwrap();

        assert_eq!(response.result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(response.result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(server.state(), ServerState::Initialising);
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut server = initialised_server();
        let init = request(2, "initialize", Some(json!({"protocolVersion": "2024-11-05"})));
        let err = server.handle_initialize(&init).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn initialize_without_params_is_invalid() {
        let mut server = server();
        let err = server
            .handle_initialize(&request(1, "initialize", None))
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
    }

    #[test]
    fn tools_list_requires_initialisation() {
        let server = server();
        let err = server
            .handle_tools_list(&request(1, "tools/list", None))
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn tools_list_after_initialisation() {
        let server = initialised_server();
        assert_eq!(server.state(), ServerState::Running);

        let response = server
            .handle_tools_list(&request(2, "tools/list", None))
            .unwrap();
        let tools = response.result["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "list_accounts"));
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result() {
        let server = initialised_server();
        let params = ToolCallParams {
            name: "delete_everything".to_string(),
            arguments: json!({}),
        };
        let response = call_tool(
            &server.tools,
            &RequestId::Number(3),
            &params,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(response.id, RequestId::Number(3));
        assert_eq!(response.result["isError"], true);
        assert!(response.result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown tool: delete_everything"));
    }

    #[test]
    fn tool_call_without_params_is_invalid() {
        let mut server = initialised_server();
        let err = server
            .start_tool_call(&request(4, "tools/call", None))
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
        assert!(server.in_flight.is_empty());
    }

    #[test]
    fn tool_call_requires_initialisation() {
        let mut server = server();
        let req = request(4, "tools/call", Some(json!({"name": "list_accounts"})));
        let err = server.start_tool_call(&req).unwrap_err();
        assert_eq!(err.error.message, "Server not initialised");
    }

    #[tokio::test]
    async fn started_call_reports_back() {
        let mut server = initialised_server();
        let req = request(7, "tools/call", Some(json!({"name": "list_accounts"})));
        server.start_tool_call(&req).unwrap();
        assert!(server.in_flight.contains_key(&RequestId::Number(7)));

        let finished = server.finished_rx.recv().await.unwrap();
        assert_eq!(finished.id, RequestId::Number(7));
        assert!(!finished.cancel.is_cancelled());
        // The interpreter does not exist, so the script fails to spawn.
        assert_eq!(finished.response.unwrap().result["isError"], true);
    }

    #[tokio::test]
    async fn running_request_id_cannot_be_reused() {
        let mut server = initialised_server();
        let req = request(7, "tools/call", Some(json!({"name": "list_accounts"})));
        server.start_tool_call(&req).unwrap();

        let err = server.start_tool_call(&req).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(server.in_flight.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_the_named_call() {
        let mut server = initialised_server();
        let first = request(7, "tools/call", Some(json!({"name": "list_accounts"})));
        let second = request(8, "tools/call", Some(json!({"name": "list_accounts"})));
        server.start_tool_call(&first).unwrap();
        server.start_tool_call(&second).unwrap();

        server.handle_notification(&notification(
            "notifications/cancelled",
            Some(json!({"requestId": 7, "reason": "user aborted"})),
        ));
        assert!(!server.in_flight.contains_key(&RequestId::Number(7)));
        assert!(server.in_flight.contains_key(&RequestId::Number(8)));

        for _ in 0..2 {
            let finished = server.finished_rx.recv().await.unwrap();
            let cancelled = finished.id == RequestId::Number(7);
            assert_eq!(finished.cancel.is_cancelled(), cancelled);
        }
        assert!(!server.shutdown_token().is_cancelled());
    }

    #[test]
    fn cancellation_accepts_string_ids() {
        let mut server = initialised_server();
        let id = RequestId::String("call-1".to_string());
        let token = server.shutdown.child_token();
        server.in_flight.insert(id, token.clone());

        server.handle_notification(&notification(
            "notifications/cancelled",
            Some(json!({"requestId": "call-1"})),
        ));
        assert!(token.is_cancelled());
        assert!(server.in_flight.is_empty());
    }

    #[test]
    fn unmatched_cancellation_is_ignored() {
        let mut server = initialised_server();
        let token = server.shutdown.child_token();
        server.in_flight.insert(RequestId::Number(1), token.clone());

        server.handle_notification(&notification(
            "notifications/cancelled",
            Some(json!({"requestId": 99})),
        ));
        server.handle_notification(&notification("notifications/cancelled", None));
        server.handle_notification(&notification(
            "notifications/cancelled",
            Some(json!({"reason": "no id"})),
        ));

        assert!(!token.is_cancelled());
        assert_eq!(server.in_flight.len(), 1);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let mut server = initialised_server();
        let err = server
            .dispatch(&request(5, "resources/list", None))
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MethodNotFound.code());
    }

    #[test]
    fn ping_works_before_initialisation() {
        let mut server = server();
        let response = server.dispatch(&request(6, "ping", None)).unwrap();
        assert_eq!(response.result, json!({}));
    }

    #[test]
    fn tool_call_result_text() {
        let result = ToolCallResult::text("Hello, world!");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Hello, world!"),
        }
    }

    #[test]
    fn tool_call_result_json_is_pretty() {
        let result = ToolCallResult::json(&json!({"count": 2}));
        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "{\n  \"count\": 2\n}"),
        }
    }

    #[test]
    fn tool_call_result_error() {
        let result = ToolCallResult::error("Something went wrong");
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);

        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "Something went wrong"),
        }
    }
}
