//! MCP resources implementation
//!
//! The server exposes a single resource, the insights memo, and pushes a
//! `notifications/resources/updated` message whenever the ledger behind it
//! changes.

pub mod memo;

use crate::error::McpResult;
use crate::gateway::DatabaseGateway;
use crate::protocol::{Notification, ResourceReadResult, ResourcesListResult};
use tokio::sync::mpsc;
use tracing::debug;

pub use memo::MEMO_URI;

/// List all available resources
pub fn list_resources() -> ResourcesListResult {
    ResourcesListResult {
        resources: vec![memo::descriptor()],
    }
}

/// Read a resource by URI.
///
/// Unknown URIs fail hard; there is no soft error channel for reads.
pub async fn read_resource(uri: &str, gateway: &DatabaseGateway) -> McpResult<ResourceReadResult> {
    debug!("📖 Reading resource: {}", uri);
    memo::read(uri, gateway).await
}

/// Sends resource change notifications to the session
#[derive(Debug, Clone)]
pub struct ResourceNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ResourceNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }

    /// Queue a resource-updated notification for `uri`. Fire-and-forget.
    pub fn notify_updated(&self, uri: &str) {
        debug!("🔔 Resource updated: {}", uri);
        if self.tx.send(Notification::resource_updated(uri)).is_err() {
            debug!("No session listening for notifications, dropped update for {}", uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_resources() {
        let result = list_resources();
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resources[0].uri, MEMO_URI);
        assert_eq!(result.resources[0].name, "Business Insights Memo");
        assert_eq!(result.resources[0].mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_notifier_sends_update() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ResourceNotifier::new(tx);
        notifier.notify_updated(MEMO_URI);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification, Notification::resource_updated(MEMO_URI));
    }

    #[test]
    fn test_notifier_without_receiver_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ResourceNotifier::new(tx).notify_updated(MEMO_URI);
    }
}
