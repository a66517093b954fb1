//! The query facade: one method per supported operation shape
//!
//! Every method validates nothing beyond names, forwards its payload to the
//! store once, logs failures and returns them to the caller.

use bson::{doc, Bson, Document as BsonDocument};
use mangrove_common::{MangroveError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::StoreConfig;
use crate::connection::Connection;
use crate::query::{unset_fields, QuerySpec};
use crate::store::{ChangeInfo, DocumentStore, MongoStore};
use crate::validation::ValidatedFieldName;

/// Log a failed operation and hand the result back unchanged
fn logged<T>(operation: &'static str, collection: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(operation, collection, error = %e, "Query failed");
    }
    result
}

/// Fixed menu of find/update/delete/aggregate operations over a store
#[derive(Clone, Debug)]
pub struct QueryFacade<S = MongoStore> {
    store: S,
}

impl QueryFacade<MongoStore> {
    /// Connect with `config` and wrap the session
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let connection = Connection::with_config(config).await?;
        Ok(Self::new(MongoStore::new(connection)))
    }

    /// A facade over another database on the same client
    pub fn with_database(&self, name: &str) -> Self {
        Self::new(MongoStore::new(self.store.connection().with_database(name)))
    }
}

impl<S: DocumentStore> QueryFacade<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify the server answers
    pub async fn ping(&self) -> Result<()> {
        let result = self.store.ping().await;
        if let Err(e) = &result {
            warn!(error = %e, "Ping failed");
        }
        result
    }

    /// Run an arbitrary `QuerySpec`
    #[instrument(level = "debug", skip_all, fields(collection = %spec.collection_name()))]
    pub async fn find(&self, spec: QuerySpec) -> Result<Vec<BsonDocument>> {
        let collection = spec.collection_name().to_string();
        logged("find", &collection, self.store.find(spec).await)
    }

    /// All documents matching `query`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn get_results(&self, collection: &str, query: BsonDocument) -> Result<Vec<BsonDocument>> {
        let spec = QuerySpec::new(collection).filter(query);
        logged("get_results", collection, self.store.find(spec).await)
    }

    /// Matching documents ordered by `sort`, e.g. `"-created,name"`
    #[instrument(level = "debug", skip_all, fields(collection = %collection, sort = %sort))]
    pub async fn get_sorted_results(
        &self,
        collection: &str,
        query: BsonDocument,
        sort: &str,
    ) -> Result<Vec<BsonDocument>> {
        let result: Result<Vec<BsonDocument>> = async {
            let spec = QuerySpec::new(collection).filter(query).sort_by(sort)?;
            self.store.find(spec).await
        }
        .await;
        logged("get_sorted_results", collection, result)
    }

    /// Matching documents restricted to the fields in `projection`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn get_fields(
        &self,
        collection: &str,
        query: BsonDocument,
        projection: BsonDocument,
    ) -> Result<Vec<BsonDocument>> {
        let spec = QuerySpec::new(collection).filter(query).projection(projection);
        logged("get_fields", collection, self.store.find(spec).await)
    }

    /// Like `get_fields` but returns at most `limit` documents (0 = all)
    #[instrument(level = "debug", skip_all, fields(collection = %collection, limit = limit))]
    pub async fn get_fields_with_limit(
        &self,
        collection: &str,
        query: BsonDocument,
        projection: BsonDocument,
        limit: i64,
    ) -> Result<Vec<BsonDocument>> {
        let spec = QuerySpec::new(collection)
            .filter(query)
            .projection(projection)
            .limit(limit);
        logged("get_fields_with_limit", collection, self.store.find(spec).await)
    }

    /// Projected documents ordered by `sort`
    #[instrument(level = "debug", skip_all, fields(collection = %collection, sort = %sort))]
    pub async fn get_sorted_fields(
        &self,
        collection: &str,
        query: BsonDocument,
        projection: BsonDocument,
        sort: &str,
    ) -> Result<Vec<BsonDocument>> {
        let result: Result<Vec<BsonDocument>> = async {
            let spec = QuerySpec::new(collection)
                .filter(query)
                .projection(projection)
                .sort_by(sort)?;
            self.store.find(spec).await
        }
        .await;
        logged("get_sorted_fields", collection, result)
    }

    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn find_documents(&self, collection: &str, query: BsonDocument) -> Result<Vec<BsonDocument>> {
        let spec = QuerySpec::new(collection).filter(query);
        logged("find_documents", collection, self.store.find(spec).await)
    }

    /// Matching documents decoded into `T`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn find_documents_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: BsonDocument,
    ) -> Result<Vec<T>> {
        let result: Result<Vec<T>> = async {
            let docs = self.store.find(QuerySpec::new(collection).filter(query)).await?;
            docs.into_iter()
                .map(|d| bson::from_document(d).map_err(MangroveError::from))
                .collect()
        }
        .await;
        logged("find_documents_as", collection, result)
    }

    /// First document matching `query`, `None` when nothing matches
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn find_one_document(
        &self,
        collection: &str,
        query: BsonDocument,
    ) -> Result<Option<BsonDocument>> {
        let spec = QuerySpec::new(collection).filter(query);
        logged("find_one_document", collection, self.store.find_one(spec).await)
    }

    /// Document whose `_id` equals `id`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn get_result_by_id(
        &self,
        collection: &str,
        id: impl Into<Bson>,
    ) -> Result<Option<BsonDocument>> {
        let spec = QuerySpec::new(collection).filter(doc! { "_id": id.into() });
        logged("get_result_by_id", collection, self.store.find_one(spec).await)
    }

    /// Insert `documents` in order and return their `_id`s
    #[instrument(level = "debug", skip_all, fields(collection = %collection, count = documents.len()))]
    pub async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>> {
        if documents.is_empty() {
            debug!("Nothing to insert");
            return Ok(Vec::new());
        }
        logged(
            "insert_documents",
            collection,
            self.store.insert_many(collection, documents).await,
        )
    }

    /// Apply `update` to the first document matching `selector`
    ///
    /// `update` may be an operator document (`$set`, ...) or a full
    /// replacement. Fails with `NotFound` when nothing matches.
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn update_document(
        &self,
        collection: &str,
        selector: BsonDocument,
        update: BsonDocument,
    ) -> Result<ChangeInfo> {
        let result = self
            .store
            .update(collection, selector, update, false)
            .await
            .and_then(|info| require_match(collection, info));
        logged("update_document", collection, result)
    }

    /// Remove `fields` from the first document matching `selector`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn delete_fields<F: AsRef<str>>(
        &self,
        collection: &str,
        selector: BsonDocument,
        fields: &[F],
    ) -> Result<ChangeInfo> {
        let result: Result<ChangeInfo> = async {
            let update = unset_fields(fields)?;
            let info = self.store.update(collection, selector, update, false).await?;
            require_match(collection, info)
        }
        .await;
        logged("delete_fields", collection, result)
    }

    /// Delete the first document matching `selector`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn remove_document(&self, collection: &str, selector: BsonDocument) -> Result<ChangeInfo> {
        let result = self
            .store
            .delete(collection, selector, false)
            .await
            .and_then(|info| {
                if info.removed == 0 {
                    Err(MangroveError::NotFound(format!(
                        "No document to remove in '{}'",
                        collection
                    )))
                } else {
                    Ok(info)
                }
            });
        logged("remove_document", collection, result)
    }

    /// Delete every document matching `selector`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn remove_all_documents(
        &self,
        collection: &str,
        selector: BsonDocument,
    ) -> Result<ChangeInfo> {
        logged(
            "remove_all_documents",
            collection,
            self.store.delete(collection, selector, true).await,
        )
    }

    /// Update the first match or insert a new document built from `update`
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn upsert_document(
        &self,
        collection: &str,
        selector: BsonDocument,
        update: BsonDocument,
    ) -> Result<ChangeInfo> {
        logged(
            "upsert_document",
            collection,
            self.store.update(collection, selector, update, true).await,
        )
    }

    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn count(&self, collection: &str, selector: BsonDocument) -> Result<u64> {
        logged("count", collection, self.store.count(collection, selector).await)
    }

    /// Distinct values of `field` among documents matching `query`
    #[instrument(level = "debug", skip_all, fields(collection = %collection, field = %field))]
    pub async fn distinct(&self, collection: &str, query: BsonDocument, field: &str) -> Result<Vec<Bson>> {
        let result: Result<Vec<Bson>> = async {
            let field = ValidatedFieldName::new(field)?;
            self.store.distinct(collection, field.as_str(), query).await
        }
        .await;
        logged("distinct", collection, result)
    }

    /// Run an aggregation pipeline
    #[instrument(level = "debug", skip_all, fields(collection = %collection, stages = pipeline.len()))]
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<BsonDocument>,
    ) -> Result<Vec<BsonDocument>> {
        logged("aggregate", collection, self.store.aggregate(collection, pipeline).await)
    }

    /// Update the first match atomically and return it as modified
    #[instrument(level = "debug", skip_all, fields(collection = %collection))]
    pub async fn find_and_modify(
        &self,
        collection: &str,
        query: BsonDocument,
        update: BsonDocument,
    ) -> Result<Option<BsonDocument>> {
        logged(
            "find_and_modify",
            collection,
            self.store.find_and_modify(collection, query, update).await,
        )
    }
}

fn require_match(collection: &str, info: ChangeInfo) -> Result<ChangeInfo> {
    if info.matched == 0 {
        return Err(MangroveError::NotFound(format!(
            "No document matched the selector in '{}'",
            collection
        )));
    }
    Ok(info)
}
