//! MongoDB-backed [`DocumentStore`]
//!
//! Thin adapter over the official `mongodb` driver. The driver's `Client`
//! is internally pooled and cheap to clone; one `MongoStore` holds one
//! database handle for the process lifetime.

use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use super::store::{BoxFuture, DocumentStore, StoreResult};

/// Document store backed by a MongoDB database
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Parse `connection_string` and bind to `db_name`.
    ///
    /// The driver connects lazily; a bad host surfaces on the first
    /// operation rather than here.
    pub async fn connect(connection_string: &str, db_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(connection_string).await?;
        let db = client.database(db_name);
        info!("🍃 Connected to MongoDB database '{}'", db_name);
        Ok(Self { db })
    }

    /// Wrap an existing database handle
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

impl DocumentStore for MongoStore {
    fn find<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(async move {
            let cursor = self.collection(collection).find(filter).await?;
            let documents: Vec<Document> = cursor.try_collect().await?;
            debug!("find on {} returned {} document(s)", collection, documents.len());
            Ok(documents)
        })
    }

    fn aggregate<'a>(
        &'a self,
        collection: &'a str,
        pipeline: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Document>>> {
        Box::pin(async move {
            let cursor = self.collection(collection).aggregate(pipeline).await?;
            Ok(cursor.try_collect().await?)
        })
    }

    fn insert_one<'a>(
        &'a self,
        collection: &'a str,
        document: Document,
    ) -> BoxFuture<'a, StoreResult<Bson>> {
        Box::pin(async move {
            let result = self.collection(collection).insert_one(document).await?;
            Ok(result.inserted_id)
        })
    }

    fn insert_many<'a>(
        &'a self,
        collection: &'a str,
        documents: Vec<Document>,
    ) -> BoxFuture<'a, StoreResult<Vec<Bson>>> {
        Box::pin(async move {
            let result = self.collection(collection).insert_many(documents).await?;
            // inserted_ids is keyed by input position
            let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
            ids.sort_by_key(|(index, _)| *index);
            Ok(ids.into_iter().map(|(_, id)| id).collect())
        })
    }

    fn update_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
        update: Document,
    ) -> BoxFuture<'a, StoreResult<u64>> {
        Box::pin(async move {
            let result = self
                .collection(collection)
                .update_many(filter, update)
                .await?;
            Ok(result.modified_count)
        })
    }

    fn delete_many<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, StoreResult<u64>> {
        Box::pin(async move {
            let result = self.collection(collection).delete_many(filter).await?;
            Ok(result.deleted_count)
        })
    }

    fn create_collection<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.db.create_collection(name).await?;
            Ok(())
        })
    }

    fn list_collection_names(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        Box::pin(async move { Ok(self.db.list_collection_names().await?) })
    }
}
