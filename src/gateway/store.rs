//! Document store trait
//!
//! Defines the [`DocumentStore`] trait the gateway drives. Concrete
//! implementations: [`MongoStore`](super::mongo::MongoStore) for a live
//! MongoDB deployment and [`MemoryStore`](super::memory::MemoryStore) for
//! tests and offline runs.

use core::future::Future;
use core::pin::Pin;

use mongodb::bson::{Bson, Document};
use thiserror::Error;

/// Boxed future returned by [`DocumentStore`] methods (no async_trait).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Fault raised by the backing store.
///
/// Carries the store's own message so callers see it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError(e.to_string())
    }
}

/// CRUD and aggregation surface of a document database.
///
/// Every method targets one named collection of the database the store
/// was opened against. Update and delete always affect all matching
/// documents.
pub trait DocumentStore: Send + Sync {
    /// Return every document in `collection` matching `filter`.
    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>>;

    /// Run an aggregation pipeline against `collection`.
    fn aggregate<'a>(
        &'a self,
        collection: &'a str,
        pipeline: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>>;

    /// Insert one document, returning its `_id`.
    fn insert_one<'a>(
        &'a self,
        collection: &'a str,
        document: Document,
    ) -> BoxFuture<'a, StoreResult<Bson>>;

    /// Insert documents, returning their `_id`s in input order.
    fn insert_many<'a>(
        &'a self,
        collection: &'a str,
        documents: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Bson>>>;

    /// Apply `update` to every document matching `filter`, returning the
    /// number of documents actually modified.
    fn update_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
        update: Document,
    ) -> BoxFuture<'a, StoreResult<u64>>;

    /// Delete every document matching `filter`, returning the count.
    fn delete_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<u64>>;

    /// Create an empty collection. Fails if it already exists.
    fn create_collection<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Names of all collections in the database.
    fn list_collection_names(&self) -> BoxFuture<'_, StoreResult<Vec<String>>>;
}
