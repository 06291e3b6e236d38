//! Database gateway
//!
//! Owns the backing [`DocumentStore`] and the session's [`InsightLedger`].
//! Translates abstract operations into store calls and normalizes results
//! into JSON that can travel inside an MCP text content item.

pub mod ledger;
pub mod memory;
pub mod mongo;
pub mod store;

pub use ledger::InsightLedger;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{BoxFuture, DocumentStore, StoreError, StoreResult};

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{Bson, Document};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Failure of a gateway operation
#[derive(Debug, Error)]
pub enum OperationError {
    /// The store rejected the operation; message is the store's own
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store did not answer within the configured bound
    #[error("Operation timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
}

/// Payload of an insert: one document or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum InsertPayload {
    One(Document),
    Many(Vec<Document>),
}

/// A collection-scoped operation the gateway can execute
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Find { filter: Document },
    Aggregate { pipeline: Vec<Document> },
    Insert(InsertPayload),
    Update { filter: Document, update: Document },
    Delete { filter: Document },
    CreateCollection,
}

impl Operation {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Find { .. } => "find",
            Operation::Aggregate { .. } => "aggregate",
            Operation::Insert(_) => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::CreateCollection => "create_collection",
        }
    }
}

/// Gateway between tool calls and the document store.
///
/// One gateway per session. Store calls are serialized through an
/// operation lock and the ledger sits behind its own mutex, so append
/// order equals call order even under concurrent dispatch.
pub struct DatabaseGateway {
    store: Arc<dyn DocumentStore>,
    ledger: Mutex<InsightLedger>,
    op_lock: Mutex<()>,
    call_timeout: Option<Duration>,
}

impl DatabaseGateway {
    /// Create a gateway over `store` with an empty ledger
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            ledger: Mutex::new(InsightLedger::new()),
            op_lock: Mutex::new(()),
            call_timeout: None,
        }
    }

    /// Bound every store call by `timeout` (`None` waits forever)
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Execute `operation` against `collection`.
    ///
    /// For [`Operation::CreateCollection`], `collection` is the name of the
    /// collection to create.
    pub async fn execute(
        &self,
        collection: &str,
        operation: Operation,
    ) -> Result<Vec<Value>, OperationError> {
        let name = operation.name();
        debug!("🗄️  Executing {} on collection {}", name, collection);

        let _guard = self.op_lock.lock().await;
        let result = self.bounded(self.run(collection, operation)).await;

        if let Err(e) = &result {
            error!("❌ Database error executing {} on {}: {}", name, collection, e);
        }
        result
    }

    /// Names of all collections in the database
    pub async fn list_collections(&self) -> Result<Vec<String>, OperationError> {
        debug!("🗄️  Listing collections");
        let _guard = self.op_lock.lock().await;
        let result = self
            .bounded(async {
                self.store
                    .list_collection_names()
                    .await
                    .map_err(OperationError::from)
            })
            .await;

        if let Err(e) = &result {
            error!("❌ Database error listing collections: {}", e);
        }
        result
    }

    /// Append an insight and return the freshly synthesized memo
    pub async fn append_insight(&self, insight: impl Into<String>) -> String {
        let mut ledger = self.ledger.lock().await;
        ledger.append(insight);
        ledger.synthesize()
    }

    /// Current memo text, recomputed on every call
    pub async fn memo(&self) -> String {
        self.ledger.lock().await.synthesize()
    }

    /// Number of insights recorded so far
    pub async fn insight_count(&self) -> usize {
        self.ledger.lock().await.len()
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, OperationError>
    where
        F: std::future::Future<Output = Result<T, OperationError>>,
    {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| OperationError::Timeout(limit))?,
            None => fut.await,
        }
    }

    async fn run(&self, collection: &str, operation: Operation) -> Result<Vec<Value>, OperationError> {
        let results = match operation {
            Operation::Find { filter } => self
                .store
                .find(collection, filter)
                .await?
                .into_iter()
                .map(to_display_json)
                .collect(),
            Operation::Aggregate { pipeline } => self
                .store
                .aggregate(collection, pipeline)
                .await?
                .into_iter()
                .map(to_display_json)
                .collect(),
            Operation::Insert(InsertPayload::One(document)) => {
                let id = self.store.insert_one(collection, document).await?;
                vec![json!({ "inserted_id": id_to_string(&id) })]
            }
            Operation::Insert(InsertPayload::Many(documents)) => {
                let ids = self.store.insert_many(collection, documents).await?;
                let ids: Vec<String> = ids.iter().map(id_to_string).collect();
                vec![json!({ "inserted_ids": ids })]
            }
            Operation::Update { filter, update } => {
                let modified = self.store.update_many(collection, filter, update).await?;
                vec![json!({ "modified_count": modified })]
            }
            Operation::Delete { filter } => {
                let deleted = self.store.delete_many(collection, filter).await?;
                vec![json!({ "deleted_count": deleted })]
            }
            Operation::CreateCollection => {
                self.store.create_collection(collection).await?;
                vec![json!({
                    "message": format!("Collection {collection} created successfully")
                })]
            }
        };
        Ok(results)
    }
}

/// Render a store document as display JSON.
///
/// ObjectIds, dates and decimals become plain strings; other non-JSON
/// values fall back to relaxed Extended JSON. Readable, not round-trippable.
pub fn to_display_json(document: Document) -> Value {
    display_value(Bson::Document(document))
}

fn display_value(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(at) => Value::String(
            at.try_to_rfc3339_string()
                .unwrap_or_else(|_| at.timestamp_millis().to_string()),
        ),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        Bson::Document(document) => Value::Object(
            document
                .into_iter()
                .map(|(key, value)| (key, display_value(value)))
                .collect(),
        ),
        Bson::Array(items) => Value::Array(items.into_iter().map(display_value).collect()),
        other => other.into_relaxed_extjson(),
    }
}

/// Stringify a store-generated identifier
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId, DateTime};

    struct FailingStore;

    impl DocumentStore for FailingStore {
        fn find<'a>(&'a self, _: &'a str, _: Document) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn aggregate<'a>(
            &'a self,
            _: &'a str,
            _: Vec<Document>,
        ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn insert_one<'a>(&'a self, _: &'a str, _: Document) -> BoxFuture<'a, StoreResult<Bson>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn insert_many<'a>(
            &'a self,
            _: &'a str,
            _: Vec<Document>,
        ) -> BoxFuture<'a, StoreResult<Vec<Bson>>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn update_many<'a>(
            &'a self,
            _: &'a str,
            _: Document,
            _: Document,
        ) -> BoxFuture<'a, StoreResult<u64>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn delete_many<'a>(&'a self, _: &'a str, _: Document) -> BoxFuture<'a, StoreResult<u64>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn create_collection<'a>(&'a self, _: &'a str) -> BoxFuture<'a, StoreResult<()>> {
            Box::pin(async { Err(StoreError::new("connection refused")) })
        }
        fn list_collection_names(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Vec::new())
            })
        }
    }

    fn memory_gateway() -> DatabaseGateway {
        DatabaseGateway::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_insert_then_find_stringifies_ids() {
        let gateway = memory_gateway();
        let inserted = gateway
            .execute(
                "orders",
                Operation::Insert(InsertPayload::Many(vec![
                    doc! {"orderId": "1", "total": 9.99},
                ])),
            )
            .await
            .unwrap();
        let ids = inserted[0]["inserted_ids"].as_array().unwrap();
        assert_eq!(ids.len(), 1);
        let id = ids[0].as_str().unwrap();
        assert_eq!(id.len(), 24);

        let found = gateway
            .execute("orders", Operation::Find { filter: doc! {} })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["orderId"], "1");
        assert_eq!(found[0]["total"], 9.99);
        assert_eq!(found[0]["_id"], id);
    }

    #[tokio::test]
    async fn test_insert_single_document() {
        let gateway = memory_gateway();
        let result = gateway
            .execute("c", Operation::Insert(InsertPayload::One(doc! {"_id": "abc"})))
            .await
            .unwrap();
        assert_eq!(result, vec![json!({"inserted_id": "abc"})]);
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let gateway = memory_gateway();
        gateway
            .execute(
                "inventory",
                Operation::Insert(InsertPayload::Many(vec![
                    doc! {"product": "Widget", "stock": 5},
                    doc! {"product": "Gadget", "stock": 2},
                ])),
            )
            .await
            .unwrap();

        let updated = gateway
            .execute(
                "inventory",
                Operation::Update {
                    filter: doc! {"product": "Widget"},
                    update: doc! {"$inc": {"stock": -1}},
                },
            )
            .await
            .unwrap();
        assert_eq!(updated, vec![json!({"modified_count": 1})]);

        let deleted = gateway
            .execute("inventory", Operation::Delete { filter: doc! {} })
            .await
            .unwrap();
        assert_eq!(deleted, vec![json!({"deleted_count": 2})]);
    }

    #[tokio::test]
    async fn test_create_collection_surfaces_store_fault() {
        let gateway = memory_gateway();
        let created = gateway
            .execute("sales", Operation::CreateCollection)
            .await
            .unwrap();
        assert_eq!(
            created,
            vec![json!({"message": "Collection sales created successfully"})]
        );

        let err = gateway
            .execute("sales", Operation::CreateCollection)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Collection sales already exists");
        assert_eq!(gateway.list_collections().await.unwrap(), vec!["sales"]);
    }

    #[tokio::test]
    async fn test_store_fault_is_verbatim() {
        let gateway = DatabaseGateway::new(Arc::new(FailingStore));
        let err = gateway
            .execute("orders", Operation::Find { filter: doc! {} })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Store(_)));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let gateway = DatabaseGateway::new(Arc::new(FailingStore))
            .with_call_timeout(Some(Duration::from_millis(20)));
        let err = gateway.list_collections().await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout(_)));
        assert!(err.to_string().starts_with("Operation timed out"));
    }

    #[tokio::test]
    async fn test_ledger_is_per_gateway() {
        let first = memory_gateway();
        let second = memory_gateway();

        let memo = first.append_insight("Sales spike in Q4").await;
        assert!(memo.contains("- Sales spike in Q4"));
        assert_eq!(first.insight_count().await, 1);
        assert_eq!(second.insight_count().await, 0);
        assert_eq!(second.memo().await, ledger::EMPTY_MEMO);
    }

    #[test]
    fn test_display_json_for_bson_types() {
        let oid = ObjectId::new();
        let value = to_display_json(doc! {
            "_id": oid,
            "at": DateTime::from_millis(0),
            "n": 3,
        });
        assert_eq!(value["_id"], oid.to_hex());
        assert!(value["at"].as_str().unwrap().starts_with("1970-01-01T00:00:00"));
        assert_eq!(value["n"], 3);

        let nested = to_display_json(doc! {"refs": [{"id": oid}], "meta": {"id": oid}});
        assert_eq!(nested["refs"][0]["id"], oid.to_hex());
        assert_eq!(nested["meta"]["id"], oid.to_hex());
    }

    #[test]
    fn test_id_to_string() {
        let oid = ObjectId::new();
        assert_eq!(id_to_string(&Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(id_to_string(&Bson::String("k".into())), "k");
        assert_eq!(id_to_string(&Bson::Int32(7)), "7");
    }
}
