//! MongoDB MCP Server
//!
//! Serves MongoDB tools and the business insights memo to an MCP client
//! over stdio.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mcp_server_mongodb::{
    Config, DatabaseGateway, DocumentStore, McpServer, MemoryStore, MongoStore, Session,
    StdioTransport, StoreConfig,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Values already set in the environment win over .env entries
    let env_file = dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
            }),
        )
        .with_writer(std::io::stderr) // stdout carries JSON-RPC
        .init();

    info!("🚀 Starting MongoDB MCP Server");
    info!("📡 Protocol: MCP 2025-06-18 over JSON-RPC 2.0");
    info!("🔌 Transport: stdio (NDJSON)");
    if let Some(path) = &env_file {
        info!("📄 Loaded environment from {}", path.display());
    }

    let store_config = match config.store() {
        Ok(store_config) => store_config,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    let call_timeout = match config.call_timeout() {
        Ok(timeout) => timeout,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn DocumentStore> = match store_config {
        StoreConfig::Mongo { uri, db_name } => match MongoStore::connect(&uri, &db_name).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("❌ Failed to connect to MongoDB: {}", e);
                return ExitCode::FAILURE;
            }
        },
        StoreConfig::InMemory => {
            warn!("🧪 Using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = Arc::new(DatabaseGateway::new(store).with_call_timeout(call_timeout));
    let (server, notifications) = McpServer::new(gateway);
    let session = Session::new(server, notifications, StdioTransport::stdio());

    info!("✅ Server ready, waiting for initialize request...");

    let code = match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Session ended with error: {}", e);
            ExitCode::FAILURE
        }
    };

    info!("👋 MongoDB MCP Server stopped");
    code
}
