//! MCP gateway server.
//!
//! The server owns the input loop. Each line is parsed and then either
//! answered locally (`initialize`, `tools/list`, protocol errors) or handed
//! to a spawned task that forwards the `tools/call` upstream and caches the
//! rendered artifact.
//!
//! # Ordering
//!
//! Tool calls run concurrently, so their responses are written in
//! completion order, not arrival order. Local answers are queued
//! immediately. Each response is written as one whole line.

use std::future::Future;
use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{JoinError, JoinSet};

use crate::catalog::Catalog;
use crate::config::{Config, ENV_API_TOKEN};
use crate::mcp::artifact::ArtifactCache;
use crate::mcp::forwarder::Upstream;
use crate::mcp::protocol::{
    parse_message, JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{spawn_writer, LineReader, OutboundSink};

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

/// Parameters for the initialize request. Only used for logging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
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

/// A message queued for the client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
    /// Built by the gateway.
    Local(JsonRpcResponse),
    /// Relayed from upstream, possibly annotated.
    Forwarded(Value),
}

/// A tool call ready to forward.
struct PendingCall {
    id: RequestId,
    tool: Option<String>,
    arguments: Value,
    envelope: Value,
    token: String,
}

/// Immutable state shared by every dispatch task.
struct Gateway<U> {
    config: Config,
    catalog: Catalog,
    upstream: U,
    cache: ArtifactCache,
}

/// The MCP gateway server.
pub struct McpServer<U> {
    gateway: Arc<Gateway<U>>,
}

impl<U: Upstream> McpServer<U> {
    /// Creates a server from its configuration, tool catalog and upstream.
    #[must_use]
    pub fn new(config: Config, catalog: Catalog, upstream: U) -> Self {
        let cache = ArtifactCache::new(config.output_dir.clone());
        Self {
            gateway: Arc::new(Gateway {
                config,
                catalog,
                upstream,
                cache,
            }),
        }
    }

    /// Serves stdio until EOF or a termination signal.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed or transport
    /// I/O fails.
    pub async fn run(&self) -> io::Result<()> {
        let shutdown = shutdown_signal()?;
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
            .await
    }

    /// Serves one input/output stream pair until EOF or `shutdown` resolves.
    ///
    /// In-flight tool calls are awaited before returning so that their
    /// responses are written.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W, S>(&self, input: R, output: W, shutdown: S) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let mut reader = LineReader::new(input);
        let (sink, writer) = spawn_writer(output);
        let mut in_flight = JoinSet::new();
        tokio::pin!(shutdown);

        let read_result = loop {
            let line = tokio::select! {
                () = &mut shutdown => break Ok(()),
                line = reader.read_line() => line,
            };

            match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        self.handle_line(&line, &sink, &mut in_flight);
                    }
                }
                Ok(None) => {
                    tracing::debug!("Input closed");
                    break Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(error = %e, "Discarding non UTF-8 input line");
                    emit(&sink, &Reply::Local(JsonRpcResponse::parse_error()));
                }
                Err(e) => break Err(e),
            }

            // Reap finished supervisors so the set stays small.
            while in_flight.try_join_next().is_some() {}
        };

        if !in_flight.is_empty() {
            tracing::debug!(pending = in_flight.len(), "Waiting for in-flight tool calls");
        }
        while in_flight.join_next().await.is_some() {}

        drop(sink);
        let write_result = writer.await.map_err(io::Error::other)?;
        read_result.and(write_result)
    }

    /// Handles a single line of input.
    fn handle_line(&self, line: &str, sink: &OutboundSink, in_flight: &mut JoinSet<()>) {
        let request = match parse_message(line) {
            Ok(request) => request,
            Err(error) => {
                tracing::debug!(?error, "Rejected input line");
                emit(sink, &Reply::Local(error));
                return;
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return;
        };

        tracing::debug!(%id, method = %request.method, "Request received");

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, &request),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => match self.prepare_tool_call(id, &request) {
                Ok(call) => {
                    self.spawn_tool_call(call, sink, in_flight);
                    return;
                }
                Err(error) => error,
            },
            _ => JsonRpcResponse::method_not_found(id, &request.method),
        };

        emit(sink, &Reply::Local(response));
    }

    /// Handles an incoming notification.
    #[allow(clippy::unused_self)]
    fn handle_notification(&self, request: &JsonRpcRequest) {
        if request.method == "notifications/initialized" {
            tracing::info!("Client initialised");
        } else {
            tracing::debug!(method = %request.method, "Ignoring notification");
        }
    }

    /// Handles the initialize request.
    #[allow(clippy::unused_self)]
    fn handle_initialize(&self, id: RequestId, request: &JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        tracing::info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()),
            client_version = params.client_info.as_ref().and_then(|c| c.version.as_deref()),
            requested_version = params.protocol_version.as_deref(),
            "Initialising session"
        );

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        )
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let credentialed = self.gateway.config.token().is_some();
        let tools = self.gateway.catalog.view(credentialed).definitions();

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Prepares a tools/call request for forwarding.
    ///
    /// Only a missing credential is answered locally. Arguments are passed
    /// through as received; a mismatch with the advertised schema is only
    /// logged. Nothing here touches the network.
    fn prepare_tool_call(
        &self,
        id: RequestId,
        request: &JsonRpcRequest,
    ) -> Result<PendingCall, JsonRpcResponse> {
        let Some(token) = self.gateway.config.token() else {
            return Err(JsonRpcResponse::server_error(
                Some(id),
                format!("{ENV_API_TOKEN} environment variable is required"),
            ));
        };

        let params = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value::<ToolCallParams>(p).ok());
        let (tool, arguments) = match params {
            Some(params) => {
                self.check_arguments(&params.name, &params.arguments);
                (Some(params.name), params.arguments)
            }
            None => {
                tracing::debug!(%id, "tools/call params carry no tool name");
                (None, Value::Null)
            }
        };

        Ok(PendingCall {
            id,
            tool,
            arguments,
            envelope: request.raw.clone(),
            token: token.to_string(),
        })
    }

    /// Logs arguments that the advertised schema would reject.
    fn check_arguments(&self, name: &str, arguments: &Value) {
        let tool = match self.gateway.catalog.full().get(name) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::debug!(error = %e, "Forwarding call to an unlisted tool");
                return;
            }
        };

        let empty = json!({});
        let arguments = if arguments.is_null() { &empty } else { arguments };
        if let Err(violations) = tool.validate(arguments) {
            tracing::debug!(tool = name, %violations, "Arguments differ from the advertised schema");
        }
    }

    /// Forwards a tool call on its own task.
    ///
    /// A supervisor awaits the task so that a panic becomes a null-id error
    /// response instead of a lost request.
    fn spawn_tool_call(&self, call: PendingCall, sink: &OutboundSink, in_flight: &mut JoinSet<()>) {
        let gateway = Arc::clone(&self.gateway);
        let task = tokio::spawn(async move { gateway.call_tool(call).await });

        let sink = sink.clone();
        in_flight.spawn(async move {
            let reply = task.await.unwrap_or_else(|e| {
                let message = panic_message(e);
                tracing::error!(error = %message, "Tool call task failed");
                Reply::Local(JsonRpcResponse::server_error(
                    None,
                    format!("Unhandled error: {message}"),
                ))
            });
            emit(&sink, &reply);
        });
    }
}

impl<U: Upstream> Gateway<U> {
    /// Forwards one call and caches its artifact.
    async fn call_tool(&self, call: PendingCall) -> Reply {
        let tool = call.tool.as_deref();
        tracing::info!(
            id = %call.id,
            tool,
            tier = ?tool.and_then(|name| self.catalog.tier_of(name)),
            "Forwarding tool call"
        );

        match self.upstream.call(&call.envelope, &call.token).await {
            Ok(response) => {
                let response = self
                    .cache
                    .annotate(&self.upstream, response, Some(&call.arguments))
                    .await;
                Reply::Forwarded(response)
            }
            Err(e) => {
                tracing::warn!(id = %call.id, tool, error = %e, "Upstream call failed");
                Reply::Local(JsonRpcResponse::server_error(Some(call.id), e.to_string()))
            }
        }
    }
}

/// Queues a reply, logging if the writer is gone.
fn emit(sink: &OutboundSink, reply: &Reply) {
    if let Err(e) = sink.send(reply) {
        tracing::warn!(error = %e, "Dropping response");
    }
}

/// Extracts a readable message from a failed task.
fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Unknown error".to_string()),
        Err(error) => error.to_string(),
    }
}

/// Resolves on SIGINT or SIGTERM.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    })
}

/// Resolves on Ctrl+C.
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    })
}
