//! Driver primitives behind the facade
//!
//! `DocumentStore` has one method per driver call the facade makes.
//! `MongoStore` is the real implementation; tests substitute a recorder.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use futures::TryStreamExt;
use mangrove_common::Result;
use mongodb::options::ReturnDocument;
use mongodb::results::UpdateResult;
use tracing::debug;

use crate::connection::Connection;
use crate::query::{QuerySpec, UpdateKind};

/// Outcome of a mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeInfo {
    /// Documents matched by the selector
    pub matched: u64,
    /// Documents actually changed
    pub updated: u64,
    pub removed: u64,
    /// `_id` of the document created by an upsert
    pub upserted_id: Option<Bson>,
}

impl From<UpdateResult> for ChangeInfo {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched: result.matched_count,
            updated: result.modified_count,
            removed: 0,
            upserted_id: result.upserted_id,
        }
    }
}

/// Primitive operations of a document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching `spec`
    async fn find(&self, spec: QuerySpec) -> Result<Vec<BsonDocument>>;

    /// First document matching `spec`
    async fn find_one(&self, spec: QuerySpec) -> Result<Option<BsonDocument>>;

    /// Insert documents in order, returning their `_id`s
    async fn insert_many(&self, collection: &str, documents: Vec<BsonDocument>) -> Result<Vec<Bson>>;

    /// Update (or replace) the first matching document
    async fn update(
        &self,
        collection: &str,
        selector: BsonDocument,
        update: BsonDocument,
        upsert: bool,
    ) -> Result<ChangeInfo>;

    /// Delete the first matching document, or all of them when `multi`
    async fn delete(&self, collection: &str, selector: BsonDocument, multi: bool) -> Result<ChangeInfo>;

    async fn count(&self, collection: &str, filter: BsonDocument) -> Result<u64>;

    async fn distinct(&self, collection: &str, field: &str, filter: BsonDocument) -> Result<Vec<Bson>>;

    async fn aggregate(&self, collection: &str, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>>;

    /// Atomically update the first match and return it as modified
    async fn find_and_modify(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<Option<BsonDocument>>;

    async fn ping(&self) -> Result<()>;
}

/// `DocumentStore` backed by the MongoDB driver
#[derive(Clone, Debug)]
pub struct MongoStore {
    connection: Connection,
}

impl MongoStore {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, spec: QuerySpec) -> Result<Vec<BsonDocument>> {
        let collection = self.connection.collection(spec.collection_name())?;

        let mut find = collection.find(spec.get_filter().clone());
        if let Some(sort) = spec.get_sort() {
            find = find.sort(sort.clone());
        }
        if let Some(projection) = spec.get_projection() {
            find = find.projection(projection.clone());
        }
        if let Some(skip) = spec.get_skip() {
            find = find.skip(skip);
        }
        if let Some(limit) = spec.get_limit() {
            find = find.limit(limit);
        }

        let cursor = find.await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        debug!(returned = docs.len(), "Find complete");
        Ok(docs)
    }

    async fn find_one(&self, spec: QuerySpec) -> Result<Option<BsonDocument>> {
        let collection = self.connection.collection(spec.collection_name())?;

        let mut find_one = collection.find_one(spec.get_filter().clone());
        if let Some(sort) = spec.get_sort() {
            find_one = find_one.sort(sort.clone());
        }
        if let Some(projection) = spec.get_projection() {
            find_one = find_one.projection(projection.clone());
        }
        if let Some(skip) = spec.get_skip() {
            find_one = find_one.skip(skip);
        }

        let doc = find_one.await?;
        debug!(found = doc.is_some(), "Find one complete");
        Ok(doc)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<BsonDocument>) -> Result<Vec<Bson>> {
        let collection = self.connection.collection(collection)?;
        let result = collection.insert_many(documents).await?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        debug!(inserted = ids.len(), "Insert complete");
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn update(
        &self,
        collection: &str,
        selector: BsonDocument,
        update: BsonDocument,
        upsert: bool,
    ) -> Result<ChangeInfo> {
        let collection = self.connection.collection(collection)?;

        let result = match UpdateKind::of(&update) {
            UpdateKind::Operators => collection.update_one(selector, update).upsert(upsert).await?,
            UpdateKind::Replacement => collection.replace_one(selector, update).upsert(upsert).await?,
        };
        debug!(
            matched = result.matched_count,
            updated = result.modified_count,
            upserted = result.upserted_id.is_some(),
            "Update complete"
        );
        Ok(result.into())
    }

    async fn delete(&self, collection: &str, selector: BsonDocument, multi: bool) -> Result<ChangeInfo> {
        let collection = self.connection.collection(collection)?;

        let result = if multi {
            collection.delete_many(selector).await?
        } else {
            collection.delete_one(selector).await?
        };
        debug!(removed = result.deleted_count, multi, "Delete complete");

        Ok(ChangeInfo {
            matched: result.deleted_count,
            removed: result.deleted_count,
            ..Default::default()
        })
    }

    async fn count(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        let collection = self.connection.collection(collection)?;
        let count = collection.count_documents(filter).await?;
        debug!(count, "Count complete");
        Ok(count)
    }

    async fn distinct(&self, collection: &str, field: &str, filter: BsonDocument) -> Result<Vec<Bson>> {
        let collection = self.connection.collection(collection)?;
        let values = collection.distinct(field, filter).await?;
        debug!(field, values = values.len(), "Distinct complete");
        Ok(values)
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>> {
        let collection = self.connection.collection(collection)?;
        let cursor = collection.aggregate(pipeline).await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        debug!(returned = docs.len(), "Aggregate complete");
        Ok(docs)
    }

    async fn find_and_modify(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<Option<BsonDocument>> {
        let collection = self.connection.collection(collection)?;

        let modified = match UpdateKind::of(&update) {
            UpdateKind::Operators => {
                collection
                    .find_one_and_update(filter, update)
                    .return_document(ReturnDocument::After)
                    .await?
            }
            UpdateKind::Replacement => {
                collection
                    .find_one_and_replace(filter, update)
                    .return_document(ReturnDocument::After)
                    .await?
            }
        };
        debug!(found = modified.is_some(), "Find and modify complete");
        Ok(modified)
    }

    async fn ping(&self) -> Result<()> {
        self.connection.ping().await?;
        debug!("Ping complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use mangrove_common::MangroveError;

    use crate::config::StoreConfig;

    async fn offline_store() -> MongoStore {
        let config = StoreConfig {
            uri: Some("mongodb://127.0.0.1:1/".to_string()),
            connect_timeout_secs: 1,
            ..Default::default()
        };
        MongoStore::new(Connection::with_config(&config).await.unwrap())
    }

    #[tokio::test]
    async fn test_invalid_collection_rejected_before_driver() {
        let store = offline_store().await;

        let err = store.count("bad$name", doc! {}).await.unwrap_err();
        assert!(matches!(err, MangroveError::Validation(_)));

        let err = store.find(QuerySpec::new("")).await.unwrap_err();
        assert!(matches!(err, MangroveError::Validation(_)));

        let err = store
            .update("bad\0name", doc! {}, doc! { "$set": { "a": 1 } }, false)
            .await
            .unwrap_err();
        assert!(matches!(err, MangroveError::Validation(_)));

        let err = store.delete("a$b", doc! {}, true).await.unwrap_err();
        assert!(matches!(err, MangroveError::Validation(_)));
    }

    #[tokio::test]
    async fn test_store_follows_connection_database() {
        let store = offline_store().await;
        assert_eq!(store.connection().database_name(), "targetdb");

        let audit = MongoStore::new(store.connection().with_database("audit"));
        assert_eq!(audit.connection().database_name(), "audit");
    }
}
