//! MongoDB MCP Server
//!
//! Model Context Protocol (MCP) server that lets a language-model client
//! query and modify a MongoDB database and collect what it learns in a
//! living business-insights memo.
//!
//! # Architecture
//!
//! ```text
//! LLM Host (Claude Desktop, IDE)
//!   ↓ stdio (JSON-RPC 2.0)
//! Session → McpServer
//!   ├─ ToolRouter ──→ DatabaseGateway ──→ DocumentStore (MongoDB | memory)
//!   │                      └─ InsightLedger
//!   ├─ memo://insights (read + update notifications)
//!   └─ prompts (mcp-demo)
//! ```
//!
//! # MCP Protocol
//!
//! - **Transport**: stdio with NDJSON
//! - **Protocol**: JSON-RPC 2.0
//! - **Version**: 2025-06-18 (2024-11-05 and 2025-03-26 accepted)
//! - **Capabilities**: Tools (8), Resources (1, subscribable), Prompts (1)

pub mod config;
pub mod error;
pub mod gateway;
pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use config::{Config, ConfigError, StoreConfig};
pub use error::{McpError, McpResult};
pub use gateway::{DatabaseGateway, DocumentStore, MemoryStore, MongoStore};
pub use server::McpServer;
pub use session::Session;
pub use tools::{ToolOutcome, ToolRouter};
pub use transport::{LineTransport, StdioTransport};
