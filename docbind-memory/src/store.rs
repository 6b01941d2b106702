//! In-memory storage implementation.
//!
//! Each collection keeps its documents in first-insertion order, indexed by
//! identity. Unsorted queries come back in that order whatever the
//! identities are; replacing a document keeps its position.

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use tracing::trace;

use docbind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::DocumentStoreResult,
    filter::{Expr, ID_KEY, Selector},
};

use crate::evaluator::{DocumentEvaluator, compare};

/// Documents of one collection.
#[derive(Default, Debug)]
struct Collection {
    /// insertion sequence -> document
    documents: BTreeMap<u64, Document>,
    /// identity -> insertion sequence
    index: HashMap<ObjectId, u64>,
    next: u64,
}

impl Collection {
    /// Returns whether a document with the same identity was replaced.
    fn upsert(&mut self, id: ObjectId, document: Document) -> bool {
        if let Some(seq) = self.index.get(&id) {
            self.documents.insert(*seq, document);
            return true;
        }

        let seq = self.next;
        self.next += 1;
        self.index.insert(id, seq);
        self.documents.insert(seq, document);
        false
    }

    fn remove(&mut self, id: &ObjectId) {
        if let Some(seq) = self.index.remove(id) {
            self.documents.remove(&seq);
        }
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }
}

type StoreMap = HashMap<String, Collection>;

/// Thread-safe in-memory document storage backend.
///
/// Cloning shares the underlying data. Queries scan the whole collection;
/// there is no indexing. The `safe` flag has no effect: every write is
/// applied before the call returns.
///
/// # Example
///
/// ```ignore
/// use docbind::{memory::InMemoryStore, session::Session};
///
/// let store = InMemoryStore::new();
/// let session = Session::new(store.clone());
/// assert_eq!(store.len("posts").await, 0);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Number of documents stored in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map(Collection::len)
            .unwrap_or(0)
    }

    /// Names of the collections holding at least one document.
    pub async fn collections(&self) -> Vec<String> {
        self.store
            .read()
            .await
            .iter()
            .filter(|(_, documents)| !documents.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        mut document: Document,
        _safe: bool,
    ) -> DocumentStoreResult<()> {
        document.insert(ID_KEY, id);

        let replaced = self
            .store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .upsert(id, document);

        trace!(collection, %id, replaced, "stored document");

        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: ObjectId, _safe: bool) -> DocumentStoreResult<()> {
        if let Some(documents) = self.store.write().await.get_mut(collection) {
            documents.remove(&id);
        }

        Ok(())
    }

    async fn query_documents(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched = documents
            .iter()
            .filter(|document| DocumentEvaluator::matches(document, selector.filter.as_ref()))
            .collect::<Vec<_>>();

        if !selector.sort.is_empty() {
            // Stable, so ties keep insertion order.
            matched.sort_by(|a, b| compare(a, b, &selector.sort));
        }

        Ok(matched
            .into_iter()
            .skip(selector.skip.unwrap_or(0))
            .take(selector.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| DocumentEvaluator::matches(document, filter))
                    .count() as u64
            })
            .unwrap_or(0))
    }
}

/// Builder for [`InMemoryStore`]. Building always succeeds.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
