//! The session: an explicit handle to a store with a queue of pending writes.
//!
//! [`Session::insert`] and [`Session::remove`] only queue work;
//! [`Session::flush`] applies the queue in order and returns once every write
//! has been handed to the backend.
//!
//! Models do not go through the queue. [`Model::save`](crate::document::Model::save)
//! and [`Model::remove`](crate::document::Model::remove) apply their own write
//! immediately and report only its outcome, so writes queued by other holders
//! of the session are neither applied nor reported by them.
//!
//! Clones share the backend and the queue. [`Session::fork`] shares only the
//! backend: use one fork per request to keep queued writes request-local.
//!
//! ```ignore
//! use docbind::{memory::InMemoryStore, session::Session};
//!
//! let session = Session::builder(InMemoryStore::new()).safe(true).build();
//!
//! // per request
//! let request = session.fork();
//! request.insert(&post, None).await?;
//! request.flush().await?;
//! ```

use bson::{Document, oid::ObjectId};
use mea::mutex::Mutex;
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    document::Model,
    error::{DocumentStoreError, DocumentStoreResult},
    filter::{Expr, Selector},
    query::Query,
    schema::{self, Schema},
};

/// A write waiting for the next flush.
#[derive(Debug, Clone, PartialEq)]
enum PendingOp {
    Save {
        collection: &'static str,
        id: ObjectId,
        document: Document,
        safe: bool,
    },
    Remove {
        collection: &'static str,
        id: ObjectId,
        safe: bool,
    },
}

/// State shared by every fork of a session.
struct Store {
    backend: Box<dyn DynStoreBackend>,
    /// Held while writes are handed to the backend, so flushes and direct
    /// writes never interleave.
    writes: Mutex<()>,
}

struct SessionInner {
    store: Arc<Store>,
    safe: bool,
    autoflush: bool,
    pending: Mutex<Vec<PendingOp>>,
}

/// Shared handle to a document store.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.inner.store.backend)
            .field("safe", &self.inner.safe)
            .field("autoflush", &self.inner.autoflush)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with default options: unacknowledged writes, autoflush on.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self::builder(backend).build()
    }

    pub fn builder<B: StoreBackend + 'static>(backend: B) -> SessionBuilder {
        SessionBuilder::new(Box::new(backend))
    }

    /// A session over the same backend and options with its own, empty queue.
    pub fn fork(&self) -> Session {
        Session {
            inner: Arc::new(SessionInner {
                store: self.inner.store.clone(),
                safe: self.inner.safe,
                autoflush: self.inner.autoflush,
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether writes wait for acknowledgment unless told otherwise.
    pub fn safe(&self) -> bool {
        self.inner.safe
    }

    pub fn autoflush(&self) -> bool {
        self.inner.autoflush
    }

    /// The backend, for downcasting to a concrete type.
    pub fn backend(&self) -> &dyn DynStoreBackend {
        self.inner.store.backend.as_ref()
    }

    /// A query over every document of type `S`.
    pub fn query<S: Schema>(&self) -> Query<S> {
        Query::new(self.clone())
    }

    /// An empty, unsaved model of type `S` bound to this session.
    pub fn create<S: Schema>(&self) -> Model<S> {
        Model::new(self.clone())
    }

    /// Validates `model` and queues it for insertion or replacement.
    ///
    /// Returns the identity the document is written under: its own, or a
    /// newly generated one on first save. The model itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] if the model does not match its schema.
    pub async fn insert<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<ObjectId> {
        let (id, op) = self.save_op(model, safe)?;
        self.enqueue(op).await;
        Ok(id)
    }

    /// Queues the deletion of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the model was never saved.
    pub async fn remove<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<()> {
        let op = self.remove_op(model, safe)?;
        self.enqueue(op).await;
        Ok(())
    }

    /// Applies every queued write in order.
    ///
    /// Stops at the first failing write; the writes queued after it are
    /// discarded and the error is returned.
    pub async fn flush(&self) -> DocumentStoreResult<()> {
        let _writes = self.inner.store.writes.lock().await;
        let ops = std::mem::take(&mut *self.inner.pending.lock().await);

        if ops.is_empty() {
            return Ok(());
        }

        debug!(operations = ops.len(), "flushing session");

        let total = ops.len();
        for (applied, op) in ops.into_iter().enumerate() {
            if let Err(err) = self.apply(op).await {
                warn!(
                    error = %err,
                    discarded = total - applied - 1,
                    "write failed during flush, discarding the rest of the queue"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Number of queued writes.
    pub async fn pending(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Drops every queued write without applying it.
    pub async fn clear(&self) {
        self.inner.pending.lock().await.clear();
    }

    /// Executes `selector` against `collection`, flushing first when autoflush is on.
    pub async fn execute(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>> {
        self.before_read().await?;
        self.inner.store.backend.query_documents(collection, selector).await
    }

    /// Counts documents in `collection` matching `filter`, flushing first when autoflush is on.
    pub async fn count(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.before_read().await?;
        self.inner.store.backend.count_documents(collection, filter).await
    }

    /// Shuts the backend down. Fails if other handles or forks of this session are alive.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        let inner = Arc::try_unwrap(self.inner)
            .map_err(|_| DocumentStoreError::Backend("session is still shared".to_string()))?;

        let leftover = inner.pending.lock().await.len();
        if leftover > 0 {
            warn!(discarded = leftover, "shutting down with unflushed writes");
        }

        let store = Arc::try_unwrap(inner.store)
            .map_err(|_| DocumentStoreError::Backend("store is still used by a forked session".to_string()))?;

        store.backend.shutdown_boxed().await
    }

    /// Validates and writes `model` right away, bypassing the queue.
    pub(crate) async fn save_now<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<ObjectId> {
        let (id, op) = self.save_op(model, safe)?;
        self.apply_now(op).await?;
        Ok(id)
    }

    /// Deletes `model` right away, bypassing the queue.
    pub(crate) async fn remove_now<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<()> {
        let op = self.remove_op(model, safe)?;
        self.apply_now(op).await
    }

    fn save_op<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<(ObjectId, PendingOp)> {
        schema::validate::<S>(model.attributes())?;

        let id = model.id().copied().unwrap_or_else(ObjectId::new);

        Ok((
            id,
            PendingOp::Save {
                collection: S::collection_name(),
                id,
                document: model.attributes().clone(),
                safe: safe.unwrap_or(self.inner.safe),
            },
        ))
    }

    fn remove_op<S: Schema>(&self, model: &Model<S>, safe: Option<bool>) -> DocumentStoreResult<PendingOp> {
        let id = model.id().copied().ok_or_else(|| {
            DocumentStoreError::InvalidDocument(format!(
                "cannot remove an unsaved document from {}",
                S::collection_name()
            ))
        })?;

        Ok(PendingOp::Remove {
            collection: S::collection_name(),
            id,
            safe: safe.unwrap_or(self.inner.safe),
        })
    }

    async fn enqueue(&self, op: PendingOp) {
        self.inner.pending.lock().await.push(op);
    }

    async fn before_read(&self) -> DocumentStoreResult<()> {
        if self.inner.autoflush {
            self.flush().await?;
        }

        Ok(())
    }

    async fn apply_now(&self, op: PendingOp) -> DocumentStoreResult<()> {
        let _writes = self.inner.store.writes.lock().await;
        self.apply(op).await
    }

    async fn apply(&self, op: PendingOp) -> DocumentStoreResult<()> {
        let backend = &self.inner.store.backend;

        match op {
            PendingOp::Save { collection, id, document, safe } => {
                backend.upsert_document(collection, id, document, safe).await
            }
            PendingOp::Remove { collection, id, safe } => backend.delete_document(collection, id, safe).await,
        }
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    backend: Box<dyn DynStoreBackend>,
    safe: bool,
    autoflush: bool,
}

impl SessionBuilder {
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self {
            backend,
            safe: false,
            autoflush: true,
        }
    }

    /// Default write-acknowledgment flag.
    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }

    /// Whether reads flush queued writes first.
    pub fn autoflush(mut self, autoflush: bool) -> Self {
        self.autoflush = autoflush;
        self
    }

    pub fn build(self) -> Session {
        Session {
            inner: Arc::new(SessionInner {
                store: Arc::new(Store {
                    backend: self.backend,
                    writes: Mutex::new(()),
                }),
                safe: self.safe,
                autoflush: self.autoflush,
                pending: Mutex::new(Vec::new()),
            }),
        }
    }
}
