//! JSON-RPC 2.0 envelope types
//!
//! See: https://www.jsonrpc.org/specification

use crate::error::McpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// Incoming JSON-RPC message.
///
/// Requests carry an `id`; notifications omit it and never get a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 success response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    pub result: Value,
}

/// JSON-RPC 2.0 error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: String,
    /// Request ID, or null if the request could not be parsed
    pub id: Value,
    pub error: JsonRpcError,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcRequest {
    /// Whether this message expects no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

impl JsonRpcResponse {
    pub fn new(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

impl JsonRpcErrorResponse {
    pub fn new(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }

    /// Error response for a request that failed with `err`
    pub fn from_error(id: Value, err: &McpError) -> Self {
        Self::new(id, JsonRpcError::new(err.error_code(), err.message(), None))
    }

    /// Response to a line that is not valid JSON-RPC
    pub fn parse_error() -> Self {
        Self::new(
            Value::Null,
            JsonRpcError::new(-32700, "Parse error".to_string(), None),
        )
    }
}

impl JsonRpcError {
    pub fn new(code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_id_is_notification() {
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .unwrap();
        assert!(request.is_notification());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_error_response_from_mcp_error() {
        let response =
            JsonRpcErrorResponse::from_error(json!(7), &McpError::MethodNotFound("foo".into()));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], -32601);
        assert_eq!(value["error"]["message"], "Method not found: foo");
        assert!(value["error"].get("data").is_none());
    }
}
