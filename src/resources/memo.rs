//! Business insights memo resource
//!
//! Provides `memo://insights`, a plain-text view over the gateway's
//! insight ledger. Always rendered fresh on read.

use crate::error::{McpError, McpResult};
use crate::gateway::DatabaseGateway;
use crate::protocol::{Resource, ResourceContent, ResourceReadResult};
use tracing::{debug, error};

/// URI of the memo resource
pub const MEMO_URI: &str = "memo://insights";

const MEMO_SCHEME: &str = "memo";
const MEMO_PATH: &str = "insights";

/// Resource descriptor for the memo
pub fn descriptor() -> Resource {
    Resource {
        uri: MEMO_URI.to_string(),
        name: "Business Insights Memo".to_string(),
        description: Some("A living document of discovered business insights".to_string()),
        mime_type: Some("text/plain".to_string()),
    }
}

/// Check that `uri` addresses the memo.
///
/// The scheme must be `memo` (any case) and the path exactly `insights`.
pub fn validate_uri(uri: &str) -> McpResult<()> {
    let (scheme, path) = uri.split_once("://").unwrap_or(("", uri));

    if !scheme.eq_ignore_ascii_case(MEMO_SCHEME) {
        error!("Unsupported URI scheme: {}", scheme);
        return Err(McpError::UnsupportedResource(format!(
            "Unsupported URI scheme: {scheme}"
        )));
    }

    if path != MEMO_PATH {
        error!("Unknown resource path: {}", path);
        return Err(McpError::UnsupportedResource(format!(
            "Unknown resource path: {path}"
        )));
    }

    Ok(())
}

/// Read the memo resource
pub async fn read(uri: &str, gateway: &DatabaseGateway) -> McpResult<ResourceReadResult> {
    validate_uri(uri)?;

    let memo = gateway.memo().await;
    debug!("📖 Memo rendered ({} bytes)", memo.len());

    Ok(ResourceReadResult {
        contents: vec![ResourceContent {
            uri: MEMO_URI.to_string(),
            mime_type: Some("text/plain".to_string()),
            text: Some(memo),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_validate_uri() {
        assert!(validate_uri(MEMO_URI).is_ok());

        let err = validate_uri("file://insights").unwrap_err();
        assert_eq!(err.message(), "Unsupported URI scheme: file");

        let err = validate_uri("memo://other").unwrap_err();
        assert_eq!(err.message(), "Unknown resource path: other");

        let err = validate_uri("memo://").unwrap_err();
        assert_eq!(err.message(), "Unknown resource path: ");

        assert!(validate_uri("insights").is_err());
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert!(validate_uri("MEMO://insights").is_ok());
        assert!(validate_uri("Memo://insights").is_ok());

        let err = validate_uri("MEMO://Insights").unwrap_err();
        assert_eq!(err.message(), "Unknown resource path: Insights");
    }

    #[tokio::test]
    async fn test_read_reflects_ledger() {
        let gateway = DatabaseGateway::new(Arc::new(MemoryStore::new()));

        let before = read(MEMO_URI, &gateway).await.unwrap();
        assert_eq!(
            before.contents[0].text.as_deref(),
            Some("No business insights have been discovered yet.")
        );

        gateway.append_insight("Churn is highest in March").await;
        let after = read(MEMO_URI, &gateway).await.unwrap();
        let text = after.contents[0].text.as_deref().unwrap();
        assert!(text.contains("- Churn is highest in March"));
        assert_eq!(after.contents[0].mime_type.as_deref(), Some("text/plain"));
    }
}
