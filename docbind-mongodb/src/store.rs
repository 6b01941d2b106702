use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{Acknowledgment, ClientOptions, FindOptions, WriteConcern},
};
use tracing::{debug, info};

use docbind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::Settings,
    error::{DocumentStoreError, DocumentStoreResult},
    filter::{Expr, ID_KEY, Selector, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// Write concern for a write: acknowledged by one node when `safe`, fire-and-forget otherwise.
fn write_concern(safe: bool) -> WriteConcern {
    WriteConcern::builder()
        .w(Acknowledgment::Nodes(if safe { 1 } else { 0 }))
        .build()
}

/// Paging and ordering of a selector. Counts beyond the driver's range are clamped.
fn find_options(selector: &Selector) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = selector.limit {
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if let Some(skip) = selector.skip {
        options.skip = Some(u64::try_from(skip).unwrap_or(u64::MAX));
    }
    if !selector.sort.is_empty() {
        options.sort = Some(
            selector
                .sort
                .iter()
                .map(|sort| {
                    let direction = match sort.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    };
                    (sort.field.clone(), direction.into())
                })
                .collect(),
        );
    }

    options
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Builder for the server and database named by `settings`.
    pub fn from_settings(settings: &Settings) -> DocumentStoreResult<MongoDbStoreBuilder> {
        MongoDbStoreBuilder::from_settings(settings)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_key(collection_name))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
        safe: bool,
    ) -> DocumentStoreResult<()> {
        let mut document = KeySanitizer::sanitize_document(document);
        document.insert(ID_KEY, id);

        self.get_collection(collection)
            .replace_one(doc! { ID_KEY: id }, document)
            .upsert(true)
            .write_concern(write_concern(safe))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: ObjectId, safe: bool) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .delete_one(doc! { ID_KEY: id })
            .write_concern(write_concern(safe))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn query_documents(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator::translate(selector.filter.as_ref())?;
        let options = find_options(selector);

        debug!(collection, %filter, "find");

        Ok(self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(KeySanitizer::restore_document)
            .collect())
    }

    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(filter)?)
            .await
            .map_err(backend_error)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    /// Fails with a configuration error when `settings` names no database.
    pub fn from_settings(settings: &Settings) -> DocumentStoreResult<Self> {
        settings.validate()?;

        Ok(Self::new(&settings.uri(), &settings.database))
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        info!(hosts = ?options.hosts, database = %self.database, "connecting to mongodb");

        Ok(MongoDbStore::new(
            Client::with_options(options).map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
