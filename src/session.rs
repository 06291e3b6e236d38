//! Session loop
//!
//! Reads JSON-RPC messages from a transport one at a time, dispatches them
//! to the [`McpServer`] and writes responses back. Resource notifications
//! raised while handling a request are written before that request's
//! response.

use crate::error::{McpError, McpResult};
use crate::protocol::{
    JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse, Notification, JSONRPC_VERSION,
};
use crate::server::McpServer;
use crate::transport::LineTransport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One client connection
pub struct Session<R, W> {
    server: McpServer,
    notifications: mpsc::UnboundedReceiver<Notification>,
    transport: LineTransport<R, W>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        server: McpServer,
        notifications: mpsc::UnboundedReceiver<Notification>,
        transport: LineTransport<R, W>,
    ) -> Self {
        Self {
            server,
            notifications,
            transport,
        }
    }

    /// Serve requests until the client closes its end.
    ///
    /// Only transport failures end the session early; every request-level
    /// error is answered and the loop continues.
    pub async fn run(mut self) -> McpResult<()> {
        loop {
            let line = match self.transport.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("📪 EOF received, shutting down gracefully");
                    return Ok(());
                }
                Err(e) => {
                    error!("❌ Error reading from transport: {}", e);
                    return Err(e);
                }
            };

            self.process_line(&line).await?;
        }
    }

    async fn process_line(&mut self, line: &str) -> McpResult<()> {
        debug!("📨 Received: {}", line);

        let raw: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("❌ Failed to parse JSON-RPC message: {}", e);
                return self
                    .transport
                    .write_message(&JsonRpcErrorResponse::parse_error())
                    .await;
            }
        };

        let id = raw.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                let err = McpError::InvalidRequest(e.to_string());
                return self.respond_error(id.unwrap_or(Value::Null), &err).await;
            }
        };

        if request.is_notification() {
            self.handle_notification(&request);
            return Ok(());
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            let err = McpError::InvalidRequest(format!(
                "unsupported jsonrpc version: {}",
                request.jsonrpc
            ));
            return self.respond_error(id, &err).await;
        }

        debug!("🎯 Method: {}, ID: {}", request.method, id);
        let outcome = self.dispatch(request).await;

        self.flush_notifications().await?;

        match outcome {
            Ok(result) => {
                self.transport
                    .write_message(&JsonRpcResponse::new(id, result))
                    .await
            }
            Err(err) => self.respond_error(id, &err).await,
        }
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> McpResult<Value> {
        let server = &self.server;
        let params = request.params;

        match request.method.as_str() {
            "initialize" => {
                info!("🔌 Handling initialize request");
                let result = server.handle_initialize(parse_params(params)?).await?;
                info!("✅ Server initialized (protocol {})", result.protocol_version);
                to_result(result)
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_result(server.handle_tools_list().await?),
            "tools/call" => to_result(server.handle_tools_call(parse_params(params)?).await?),
            "resources/list" => to_result(server.handle_resources_list().await?),
            "resources/read" => {
                to_result(server.handle_resources_read(parse_params(params)?).await?)
            }
            "resources/subscribe" => {
                server
                    .handle_resources_subscribe(parse_params(params)?)
                    .await?;
                Ok(json!({}))
            }
            "resources/unsubscribe" => {
                server
                    .handle_resources_unsubscribe(parse_params(params)?)
                    .await?;
                Ok(json!({}))
            }
            "prompts/list" => to_result(server.handle_prompts_list().await?),
            "prompts/get" => to_result(server.handle_prompts_get(parse_params(params)?).await?),
            other => {
                warn!("⚠️  Unknown method: {}", other);
                Err(McpError::MethodNotFound(other.to_string()))
            }
        }
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("✅ Client reported initialized"),
            "notifications/cancelled" => debug!("Client cancelled a request"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    /// Write every queued notification to the transport
    async fn flush_notifications(&mut self) -> McpResult<()> {
        while let Ok(notification) = self.notifications.try_recv() {
            debug!("🔔 Sending {}", notification.method);
            self.transport.write_message(&notification).await?;
        }
        Ok(())
    }

    async fn respond_error(&mut self, id: Value, err: &McpError) -> McpResult<()> {
        debug!("Request {} failed: {}", id, err);
        self.transport
            .write_message(&JsonRpcErrorResponse::from_error(id, err))
            .await
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn to_result<T: Serialize>(result: T) -> McpResult<Value> {
    serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
}
