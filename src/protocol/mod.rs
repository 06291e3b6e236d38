//! JSON-RPC 2.0 and MCP protocol types
//!
//! Hand-written serde types; no JSON-RPC framework crate.

pub mod jsonrpc;
pub mod mcp;

pub use jsonrpc::*;
pub use mcp::*;
