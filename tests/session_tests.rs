//! End-to-end session tests over an in-process duplex pipe

use std::sync::Arc;

use mcp_server_mongodb::{DatabaseGateway, LineTransport, McpServer, MemoryStore, Session};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Feed `requests` to a fresh session and collect every line it writes
async fn exchange(requests: &[Value]) -> Vec<Value> {
    let gateway = Arc::new(DatabaseGateway::new(Arc::new(MemoryStore::new())));
    let (server, notifications) = McpServer::new(gateway);

    let (client, server_io) = tokio::io::duplex(256 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let session = Session::new(
        server,
        notifications,
        LineTransport::new(BufReader::new(server_read), server_write),
    );

    let (client_read, mut client_write) = tokio::io::split(client);
    let client = async move {
        for request in requests {
            let line = format!("{}\n", request);
            client_write.write_all(line.as_bytes()).await.unwrap();
        }
        client_write.shutdown().await.unwrap();

        let mut replies = Vec::new();
        let mut lines = BufReader::new(client_read).lines();
        while let Some(line) = lines.next_line().await.unwrap() {
            replies.push(serde_json::from_str(&line).unwrap());
        }
        replies
    };

    let (result, replies) = tokio::join!(session.run(), client);
    result.unwrap();
    replies
}

fn initialize(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "session-test", "version": "1.0"}
        }
    })
}

fn call_tool(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

#[tokio::test]
async fn test_initialize_and_list() {
    let replies = exchange(&[
        initialize(1),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        request(2, "tools/list", json!({})),
        request(3, "resources/list", json!({})),
        request(4, "prompts/list", json!({})),
    ])
    .await;

    assert_eq!(replies.len(), 4);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "mongodb");
    assert_eq!(replies[0]["result"]["protocolVersion"], "2025-06-18");

    let tools: Vec<&str> = replies[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        tools,
        vec![
            "find",
            "aggregate",
            "insert",
            "update",
            "delete",
            "create-collection",
            "list-collections",
            "append-insight"
        ]
    );
    assert_eq!(replies[1]["result"]["tools"][0]["inputSchema"]["type"], "object");

    assert_eq!(replies[2]["result"]["resources"][0]["uri"], "memo://insights");
    assert_eq!(replies[3]["result"]["prompts"][0]["name"], "mcp-demo");
}

#[tokio::test]
async fn test_notification_precedes_response() {
    let replies = exchange(&[
        initialize(1),
        call_tool(2, "append-insight", json!({"insight": "Sales spike in Q4"})),
        request(3, "resources/read", json!({"uri": "memo://insights"})),
    ])
    .await;

    assert_eq!(replies.len(), 4);

    assert!(replies[1].get("id").is_none());
    assert_eq!(replies[1]["method"], "notifications/resources/updated");
    assert_eq!(replies[1]["params"]["uri"], "memo://insights");

    assert_eq!(replies[2]["id"], 2);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "Insight added to memo");
    assert_eq!(replies[2]["result"]["isError"], false);

    let memo = replies[3]["result"]["contents"][0]["text"].as_str().unwrap();
    assert_eq!(memo.matches("- Sales spike in Q4").count(), 1);
    assert!(!memo.contains("Summary:"));
    assert_eq!(replies[3]["result"]["contents"][0]["mimeType"], "text/plain");
}

#[tokio::test]
async fn test_bad_resource_uri_is_hard_error() {
    let replies = exchange(&[
        initialize(1),
        request(2, "resources/read", json!({"uri": "file://etc/passwd"})),
        request(3, "resources/read", json!({"uri": "memo://other"})),
    ])
    .await;

    assert_eq!(replies[1]["error"]["code"], -32602);
    assert_eq!(replies[1]["error"]["message"], "Unsupported URI scheme: file");
    assert_eq!(replies[2]["error"]["message"], "Unknown resource path: other");
}

#[tokio::test]
async fn test_tool_errors_stay_in_band() {
    let replies = exchange(&[
        initialize(1),
        call_tool(2, "drop-database", json!({})),
        call_tool(3, "find", json!({"collection": "orders"})),
    ])
    .await;

    assert_eq!(replies[1]["result"]["isError"], true);
    assert_eq!(
        replies[1]["result"]["content"][0]["text"],
        "Error: Unknown tool: drop-database"
    );
    assert!(replies[2]["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Error: "));
}

#[tokio::test]
async fn test_unknown_method_and_uninitialized() {
    let replies = exchange(&[
        request(1, "tools/list", json!({})),
        initialize(2),
        request(3, "sampling/createMessage", json!({})),
    ])
    .await;

    assert_eq!(replies[0]["error"]["code"], -32002);
    assert!(replies[1].get("result").is_some());
    assert_eq!(replies[2]["error"]["code"], -32601);
    assert_eq!(
        replies[2]["error"]["message"],
        "Method not found: sampling/createMessage"
    );
}

#[tokio::test]
async fn test_prompt_get() {
    let replies = exchange(&[
        initialize(1),
        request(
            2,
            "prompts/get",
            json!({"name": "mcp-demo", "arguments": {"topic": "coffee shops"}}),
        ),
        request(3, "prompts/get", json!({"name": "mcp-demo"})),
    ])
    .await;

    let text = replies[1]["result"]["messages"][0]["content"]["text"]
        .as_str()
        .unwrap();
    assert!(text.contains("coffee shops"));
    assert_eq!(replies[2]["error"]["code"], -32602);
}

#[tokio::test]
async fn test_subscribe_acknowledges() {
    let replies = exchange(&[
        initialize(1),
        request(2, "resources/subscribe", json!({"uri": "memo://insights"})),
        request(3, "resources/unsubscribe", json!({"uri": "memo://insights"})),
    ])
    .await;

    assert_eq!(replies[1]["result"], json!({}));
    assert_eq!(replies[2]["result"], json!({}));
}
