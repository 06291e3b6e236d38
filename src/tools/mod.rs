//! MCP tools implementation
//!
//! The router maps a tool name and its arguments onto the database gateway
//! or the insight ledger. Every failure, whether bad arguments, an unknown
//! tool or a store fault, comes back as an `Error: ...` text result instead
//! of a JSON-RPC error, so the calling agent sees it and carries on.

pub mod args;
pub mod catalog;

pub use args::ToolArguments;
pub use catalog::{find_tool, tool_definitions, GatewayCall, ToolHandler, ToolSpec, TOOLS};

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gateway::{DatabaseGateway, OperationError};
use crate::protocol::{ToolCallResult, ToolContent};
use crate::resources::{ResourceNotifier, MEMO_URI};

/// Reply text for a successful append-insight call
pub const INSIGHT_ADDED: &str = "Insight added to memo";

/// Reasons a tool call fails
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing arguments")]
    MissingArguments,

    #[error("Missing insight argument")]
    MissingInsight,

    #[error("Missing required argument: {0}")]
    MissingField(String),

    #[error("Invalid argument '{field}': expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid argument '{field}': {reason}")]
    InvalidDocument { field: String, reason: String },

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Failed to render result: {0}")]
    Render(#[from] serde_json::Error),
}

impl ToolError {
    /// Whether the call was rejected before reaching the gateway
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            ToolError::Operation(_) | ToolError::Render(_) | ToolError::UnknownTool(_)
        )
    }
}

/// Result of a tool call: success text or error text, never a fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    /// Already prefixed with `Error: `
    Failure(String),
}

impl ToolOutcome {
    fn failure(err: &ToolError) -> Self {
        ToolOutcome::Failure(format!("Error: {err}"))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Success(text) | ToolOutcome::Failure(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }
}

impl From<ToolOutcome> for ToolCallResult {
    fn from(outcome: ToolOutcome) -> Self {
        let is_error = outcome.is_error();
        let text = match outcome {
            ToolOutcome::Success(text) | ToolOutcome::Failure(text) => text,
        };
        ToolCallResult {
            content: vec![ToolContent::Text { text }],
            is_error: Some(is_error),
        }
    }
}

/// Dispatches tool calls for one session
pub struct ToolRouter {
    gateway: Arc<DatabaseGateway>,
    notifier: ResourceNotifier,
}

impl ToolRouter {
    pub fn new(gateway: Arc<DatabaseGateway>, notifier: ResourceNotifier) -> Self {
        Self { gateway, notifier }
    }

    /// Run tool `name` with `arguments`
    pub async fn dispatch(&self, name: &str, arguments: Option<Value>) -> ToolOutcome {
        debug!("🛠️  Calling tool: {}", name);
        match self.try_dispatch(name, arguments).await {
            Ok(text) => ToolOutcome::Success(text),
            Err(e) => {
                if e.is_validation() {
                    debug!("Rejected {} call: {}", name, e);
                } else {
                    warn!("⚠️  Tool {} failed: {}", name, e);
                }
                ToolOutcome::failure(&e)
            }
        }
    }

    async fn try_dispatch(&self, name: &str, arguments: Option<Value>) -> Result<String, ToolError> {
        let spec = find_tool(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        match spec.handler {
            ToolHandler::ListCollections => {
                let names = self.gateway.list_collections().await?;
                render(&names)
            }
            ToolHandler::AppendInsight => {
                let args = ToolArguments::parse(arguments).ok_or(ToolError::MissingInsight)?;
                check_required(spec, &args).map_err(|_| ToolError::MissingInsight)?;
                self.append_insight(&args).await
            }
            ToolHandler::Gateway(build) => {
                let args = ToolArguments::parse(arguments)
                    .filter(|args| !args.is_empty())
                    .ok_or(ToolError::MissingArguments)?;
                check_required(spec, &args)?;

                let call = build(&args)?;
                let results = self
                    .gateway
                    .execute(&call.collection, call.operation)
                    .await?;
                render(&results)
            }
        }
    }

    async fn append_insight(&self, args: &ToolArguments) -> Result<String, ToolError> {
        let insight = match args.require("insight")? {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        let _memo = self.gateway.append_insight(insight).await;
        info!(
            "💡 Insight recorded ({} total)",
            self.gateway.insight_count().await
        );
        self.notifier.notify_updated(MEMO_URI);

        Ok(INSIGHT_ADDED.to_string())
    }
}

/// Presence check for the fields the tool table marks as required
fn check_required(spec: &ToolSpec, args: &ToolArguments) -> Result<(), ToolError> {
    for field in spec.required {
        args.require(field)?;
    }
    Ok(())
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(value)?)
}
