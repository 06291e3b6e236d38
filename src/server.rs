//! MCP server implementation
//!
//! Handles the MCP protocol lifecycle and routes each request to the tool
//! router, the memo resource or the prompt table.

use crate::error::{McpError, McpResult};
use crate::gateway::DatabaseGateway;
use crate::protocol::{
    InitializeParams, InitializeResult, Notification, PromptsCapability, PromptsGetParams,
    PromptsGetResult, PromptsListResult, ResourceReadParams, ResourceReadResult,
    ResourceSubscribeParams, ResourcesCapability, ResourcesListResult, ServerCapabilities,
    ServerInfo, ToolCallParams, ToolCallResult, ToolsCapability, ToolsListResult,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::prompts;
use crate::resources::{self, memo, ResourceNotifier};
use crate::tools::{self, ToolRouter};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "mongodb";

/// MCP server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Server created but not initialized
    Uninitialized,
    /// Server initialized and ready to handle requests
    Ready,
}

/// MCP server for one session
pub struct McpServer {
    state: Mutex<ServerState>,
    gateway: Arc<DatabaseGateway>,
    router: ToolRouter,
}

impl McpServer {
    /// Create a server over `gateway`.
    ///
    /// The returned receiver yields resource notifications raised while
    /// handling requests; the session writes them to the client.
    pub fn new(gateway: Arc<DatabaseGateway>) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let router = ToolRouter::new(gateway.clone(), ResourceNotifier::new(notification_tx));

        let server = Self {
            state: Mutex::new(ServerState::Uninitialized),
            gateway,
            router,
        };

        (server, notification_rx)
    }

    /// Get current server state
    pub async fn state(&self) -> ServerState {
        *self.state.lock().await
    }

    /// Check if server is ready
    pub async fn is_ready(&self) -> bool {
        self.state().await == ServerState::Ready
    }

    async fn ensure_ready(&self) -> McpResult<()> {
        if self.is_ready().await {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    /// Handle MCP initialize request
    ///
    /// Negotiates the protocol version and advertises capabilities. Calling
    /// it again on a ready server is harmless.
    pub async fn handle_initialize(&self, params: InitializeParams) -> McpResult<InitializeResult> {
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            return Err(McpError::UnsupportedProtocol(params.protocol_version));
        }

        if let Some(client) = &params.client_info {
            info!("🤝 Client: {} {}", client.name, client.version);
        }

        *self.state.lock().await = ServerState::Ready;

        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
            resources: Some(ResourcesCapability {
                subscribe: Some(true),
                list_changed: Some(false),
            }),
            prompts: Some(PromptsCapability {
                list_changed: Some(false),
            }),
        };

        let server_info = ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(InitializeResult {
            protocol_version: params.protocol_version,
            capabilities,
            server_info,
        })
    }

    /// Handle tools/list request
    pub async fn handle_tools_list(&self) -> McpResult<ToolsListResult> {
        self.ensure_ready().await?;
        debug!("📋 Listing available tools");

        Ok(ToolsListResult {
            tools: tools::tool_definitions(),
        })
    }

    /// Handle tools/call request
    ///
    /// Never fails once initialized: tool failures are carried in the
    /// result with `isError` set.
    pub async fn handle_tools_call(&self, params: ToolCallParams) -> McpResult<ToolCallResult> {
        self.ensure_ready().await?;

        let outcome = self.router.dispatch(&params.name, params.arguments).await;
        Ok(outcome.into())
    }

    /// Handle resources/list request
    pub async fn handle_resources_list(&self) -> McpResult<ResourcesListResult> {
        self.ensure_ready().await?;
        debug!("📋 Handling resources/list");
        Ok(resources::list_resources())
    }

    /// Handle resources/read request
    pub async fn handle_resources_read(
        &self,
        params: ResourceReadParams,
    ) -> McpResult<ResourceReadResult> {
        self.ensure_ready().await?;
        resources::read_resource(&params.uri, &self.gateway).await
    }

    /// Handle resources/subscribe request
    ///
    /// Updates are pushed for the memo whether or not a client subscribed,
    /// so this only checks the URI.
    pub async fn handle_resources_subscribe(&self, params: ResourceSubscribeParams) -> McpResult<()> {
        self.ensure_ready().await?;
        memo::validate_uri(&params.uri)?;
        info!("🔔 Client subscribed to {}", params.uri);
        Ok(())
    }

    /// Handle resources/unsubscribe request
    pub async fn handle_resources_unsubscribe(
        &self,
        params: ResourceSubscribeParams,
    ) -> McpResult<()> {
        self.ensure_ready().await?;
        memo::validate_uri(&params.uri)?;
        info!("🔕 Client unsubscribed from {}", params.uri);
        Ok(())
    }

    /// Handle prompts/list request
    pub async fn handle_prompts_list(&self) -> McpResult<PromptsListResult> {
        self.ensure_ready().await?;
        Ok(PromptsListResult {
            prompts: prompts::list_prompts(),
        })
    }

    /// Handle prompts/get request
    pub async fn handle_prompts_get(&self, params: PromptsGetParams) -> McpResult<PromptsGetResult> {
        self.ensure_ready().await?;
        debug!("📝 Rendering prompt {}", params.name);
        prompts::get_prompt(&params.name, params.arguments.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryStore;
    use crate::protocol::MCP_PROTOCOL_VERSION;
    use crate::resources::MEMO_URI;
    use serde_json::json;

    fn server() -> (McpServer, mpsc::UnboundedReceiver<Notification>) {
        let gateway = Arc::new(DatabaseGateway::new(Arc::new(MemoryStore::new())));
        McpServer::new(gateway)
    }

    fn init_params(version: &str) -> InitializeParams {
        serde_json::from_value(json!({
            "protocolVersion": version,
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "0.0.1"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_requests_before_initialize_are_rejected() {
        let (server, _rx) = server();
        assert_eq!(server.state().await, ServerState::Uninitialized);
        assert!(matches!(
            server.handle_tools_list().await,
            Err(McpError::NotInitialized)
        ));
        assert!(matches!(
            server.handle_resources_list().await,
            Err(McpError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_initialize() {
        let (server, _rx) = server();
        let result = server
            .handle_initialize(init_params("2024-11-05"))
            .await
            .unwrap();
        assert!(server.is_ready().await);
        assert_eq!(result.protocol_version, "2024-11-05");
        assert_eq!(result.server_info.name, SERVER_NAME);

        let caps = serde_json::to_value(&result.capabilities).unwrap();
        assert_eq!(caps["resources"]["subscribe"], true);
        assert!(caps.get("tools").is_some());
        assert!(caps.get("prompts").is_some());
    }

    #[tokio::test]
    async fn test_initialize_rejects_unknown_version() {
        let (server, _rx) = server();
        let err = server
            .handle_initialize(init_params("1999-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::UnsupportedProtocol(_)));
        assert!(!server.is_ready().await);
    }

    #[tokio::test]
    async fn test_tool_call_failure_is_not_a_protocol_error() {
        let (server, _rx) = server();
        server.handle_initialize(init_params(MCP_PROTOCOL_VERSION)).await.unwrap();

        let params = ToolCallParams {
            name: "find".to_string(),
            arguments: None,
        };
        let result = server.handle_tools_call(params).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.text(), Some("Error: Missing arguments"));
    }

    #[tokio::test]
    async fn test_subscribe_validates_uri() {
        let (server, _rx) = server();
        server.handle_initialize(init_params(MCP_PROTOCOL_VERSION)).await.unwrap();

        let ok = ResourceSubscribeParams {
            uri: MEMO_URI.to_string(),
        };
        assert!(server.handle_resources_subscribe(ok.clone()).await.is_ok());
        assert!(server.handle_resources_unsubscribe(ok).await.is_ok());

        let bad = ResourceSubscribeParams {
            uri: "file://etc/passwd".to_string(),
        };
        let err = server.handle_resources_subscribe(bad).await.unwrap_err();
        assert_eq!(err.message(), "Unsupported URI scheme: file");
    }

    #[tokio::test]
    async fn test_insight_flows_into_memo() {
        let (server, mut rx) = server();
        server.handle_initialize(init_params(MCP_PROTOCOL_VERSION)).await.unwrap();

        server
            .handle_tools_call(ToolCallParams {
                name: "append-insight".to_string(),
                arguments: Some(json!({"insight": "Repeat customers spend 3x more"})),
            })
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), Notification::resource_updated(MEMO_URI));

        let read = server
            .handle_resources_read(ResourceReadParams {
                uri: MEMO_URI.to_string(),
            })
            .await
            .unwrap();
        let text = read.contents[0].text.as_deref().unwrap();
        assert!(text.contains("- Repeat customers spend 3x more"));
    }
}
