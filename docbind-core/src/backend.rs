//! Storage backend abstraction.
//!
//! A [`StoreBackend`] is the query-execution and write capability the rest of
//! the crate builds on. It executes [`Selector`]s, counts matches and applies
//! single-document writes. Implementations must be thread-safe; the session
//! serializes the writes it issues but many sessions may share one backend.
//!
//! Documents cross this boundary as `bson::Document`s. Results carry the
//! identity under [`ID_KEY`](crate::filter::ID_KEY); writes receive it
//! separately and must store it under that key.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use std::{any::Any, fmt::Debug};

use crate::{
    error::DocumentStoreResult,
    filter::{Expr, Selector},
};

/// Abstract interface for document storage backends.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts the document under `id`, replacing any stored document with that identity.
    ///
    /// `safe` asks the backend to wait for the write to be acknowledged.
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
        safe: bool,
    ) -> DocumentStoreResult<()>;

    /// Deletes the document with `id`. Deleting a missing document is not an error.
    async fn delete_document(
        &self,
        collection: &str,
        id: ObjectId,
        safe: bool,
    ) -> DocumentStoreResult<()>;

    /// Executes a selector and returns the matching documents in order.
    async fn query_documents(
        &self,
        collection: &str,
        selector: &Selector,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Counts the documents matching `filter`, ignoring any slicing.
    async fn count_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Releases connections and other resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe mirror of [`StoreBackend`] used behind a `Box<dyn _>`.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
        safe: bool,
    ) -> DocumentStoreResult<()>;
    async fn delete_document(&self, collection: &str, id: ObjectId, safe: bool) -> DocumentStoreResult<()>;
    async fn query_documents(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>>;
    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
        safe: bool,
    ) -> DocumentStoreResult<()> {
        StoreBackend::upsert_document(self, collection, id, document, safe).await
    }

    async fn delete_document(&self, collection: &str, id: ObjectId, safe: bool) -> DocumentStoreResult<()> {
        StoreBackend::delete_document(self, collection, id, safe).await
    }

    async fn query_documents(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::query_documents(self, collection, selector).await
    }

    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, collection, filter).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Factory for backends that need async setup (connecting, authenticating).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
