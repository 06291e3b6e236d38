//! Typed access to tool-call arguments

use mongodb::bson::Document;
use serde_json::{Map, Value};

use super::ToolError;
use crate::gateway::InsertPayload;

/// Arguments object of a tool call
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    map: Map<String, Value>,
}

impl ToolArguments {
    /// Interpret the raw `arguments` member of a tools/call request.
    ///
    /// Only an object carries arguments. Anything else (absent, null, an
    /// array, a scalar) yields `None` and is reported as missing arguments.
    pub fn parse(arguments: Option<Value>) -> Option<Self> {
        match arguments {
            Some(Value::Object(map)) => Some(Self { map }),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Raw value of a required field
    pub fn require(&self, field: &str) -> Result<&Value, ToolError> {
        self.map
            .get(field)
            .ok_or_else(|| ToolError::MissingField(field.to_string()))
    }

    pub fn string(&self, field: &str) -> Result<String, ToolError> {
        match self.require(field)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(invalid(field, "string")),
        }
    }

    /// A field holding one document, parsed as Extended JSON
    pub fn document(&self, field: &str) -> Result<Document, ToolError> {
        match self.require(field)? {
            Value::Object(map) => to_document(field, map),
            _ => Err(invalid(field, "object")),
        }
    }

    /// A field holding an array of documents
    pub fn documents(&self, field: &str) -> Result<Vec<Document>, ToolError> {
        match self.require(field)? {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => to_document(field, map),
                    _ => Err(invalid(field, "array of objects")),
                })
                .collect(),
            _ => Err(invalid(field, "array of objects")),
        }
    }

    /// A field holding either one document or an array of them
    pub fn insert_payload(&self, field: &str) -> Result<InsertPayload, ToolError> {
        match self.require(field)? {
            Value::Object(map) => Ok(InsertPayload::One(to_document(field, map)?)),
            Value::Array(_) => Ok(InsertPayload::Many(self.documents(field)?)),
            _ => Err(invalid(field, "object or array of objects")),
        }
    }
}

fn invalid(field: &str, expected: &'static str) -> ToolError {
    ToolError::InvalidField {
        field: field.to_string(),
        expected,
    }
}

fn to_document(field: &str, map: &Map<String, Value>) -> Result<Document, ToolError> {
    Document::try_from(map.clone()).map_err(|e| ToolError::InvalidDocument {
        field: field.to_string(),
        reason: e.to_string(),
    })
}
