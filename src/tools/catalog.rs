//! Declarative tool table
//!
//! Each entry names a tool, its input schema, the arguments that must be
//! present, and how it is handled. Adding a tool means adding a row here.

use serde_json::{json, Value};

use super::args::ToolArguments;
use super::ToolError;
use crate::gateway::Operation;
use crate::protocol::Tool;

/// A gateway operation bound to its target collection
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCall {
    pub collection: String,
    pub operation: Operation,
}

/// Builds a gateway call from validated arguments
pub type CallBuilder = fn(&ToolArguments) -> Result<GatewayCall, ToolError>;

/// How a tool is executed
#[derive(Clone, Copy)]
pub enum ToolHandler {
    /// Forwarded to the database gateway
    Gateway(CallBuilder),
    /// Lists collection names; takes no arguments
    ListCollections,
    /// Appends to the insight ledger and notifies the memo resource
    AppendInsight,
}

/// One row of the tool table
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Arguments checked for presence before the handler runs
    pub required: &'static [&'static str],
    pub handler: ToolHandler,
    input_schema: fn() -> Value,
}

impl ToolSpec {
    /// MCP tool definition for tools/list
    pub fn definition(&self) -> Tool {
        Tool {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: (self.input_schema)(),
        }
    }
}

/// Every tool the server exposes
pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "find",
        description: "Execute a find query on MongoDB",
        required: &["collection", "query"],
        handler: ToolHandler::Gateway(build_find),
        input_schema: find_schema,
    },
    ToolSpec {
        name: "aggregate",
        description: "Execute an aggregation pipeline on MongoDB",
        required: &["collection", "pipeline"],
        handler: ToolHandler::Gateway(build_aggregate),
        input_schema: aggregate_schema,
    },
    ToolSpec {
        name: "insert",
        description: "Insert documents into MongoDB",
        required: &["collection", "documents"],
        handler: ToolHandler::Gateway(build_insert),
        input_schema: insert_schema,
    },
    ToolSpec {
        name: "update",
        description: "Update documents in MongoDB",
        required: &["collection", "filter", "update"],
        handler: ToolHandler::Gateway(build_update),
        input_schema: update_schema,
    },
    ToolSpec {
        name: "delete",
        description: "Delete documents from MongoDB",
        required: &["collection", "filter"],
        handler: ToolHandler::Gateway(build_delete),
        input_schema: delete_schema,
    },
    ToolSpec {
        name: "create-collection",
        description: "Create a new collection in MongoDB",
        required: &["name"],
        handler: ToolHandler::Gateway(build_create_collection),
        input_schema: create_collection_schema,
    },
    ToolSpec {
        name: "list-collections",
        description: "List all collections in MongoDB",
        required: &[],
        handler: ToolHandler::ListCollections,
        input_schema: empty_schema,
    },
    ToolSpec {
        name: "append-insight",
        description: "Add a business insight to the memo",
        required: &["insight"],
        handler: ToolHandler::AppendInsight,
        input_schema: append_insight_schema,
    },
];

/// Look up a tool by name
pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|spec| spec.name == name)
}

/// Definitions of all tools, in table order
pub fn tool_definitions() -> Vec<Tool> {
    TOOLS.iter().map(ToolSpec::definition).collect()
}

// ---------------------------------------------------------------------------
// Call builders
// ---------------------------------------------------------------------------

fn build_find(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("collection")?,
        operation: Operation::Find {
            filter: args.document("query")?,
        },
    })
}

fn build_aggregate(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("collection")?,
        operation: Operation::Aggregate {
            pipeline: args.documents("pipeline")?,
        },
    })
}

fn build_insert(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("collection")?,
        operation: Operation::Insert(args.insert_payload("documents")?),
    })
}

fn build_update(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("collection")?,
        operation: Operation::Update {
            filter: args.document("filter")?,
            update: args.document("update")?,
        },
    })
}

fn build_delete(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("collection")?,
        operation: Operation::Delete {
            filter: args.document("filter")?,
        },
    })
}

fn build_create_collection(args: &ToolArguments) -> Result<GatewayCall, ToolError> {
    Ok(GatewayCall {
        collection: args.string("name")?,
        operation: Operation::CreateCollection,
    })
}

// ---------------------------------------------------------------------------
// Input schemas
// ---------------------------------------------------------------------------

fn collection_property() -> Value {
    json!({"type": "string", "description": "Collection name"})
}

fn find_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection": collection_property(),
            "query": {"type": "object", "description": "MongoDB find query"}
        },
        "required": ["collection", "query"]
    })
}

fn aggregate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection": collection_property(),
            "pipeline": {
                "type": "array",
                "items": {"type": "object"},
                "description": "MongoDB aggregation pipeline stages"
            }
        },
        "required": ["collection", "pipeline"]
    })
}

fn insert_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection": collection_property(),
            "documents": {
                "type": "array",
                "items": {"type": "object"},
                "description": "Documents to insert"
            }
        },
        "required": ["collection", "documents"]
    })
}

fn update_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection": collection_property(),
            "filter": {"type": "object", "description": "Filter criteria"},
            "update": {"type": "object", "description": "Update operations"}
        },
        "required": ["collection", "filter", "update"]
    })
}

fn delete_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection": collection_property(),
            "filter": {"type": "object", "description": "Filter criteria"}
        },
        "required": ["collection", "filter"]
    })
}

fn create_collection_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": collection_property()
        },
        "required": ["name"]
    })
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn append_insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "insight": {
                "type": "string",
                "description": "Business insight discovered from data analysis"
            }
        },
        "required": ["insight"]
    })
}
