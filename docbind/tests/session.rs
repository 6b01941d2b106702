mod common;

use anyhow::Result;
use docbind::{
    bson::{Document, oid::ObjectId},
    memory::InMemoryStore,
    prelude::*,
};

use common::{Author, Post, save_post};

#[tokio::test]
async fn reads_flush_pending_writes() -> Result<()> {
    let session = Session::new(InMemoryStore::new());
    let mut post = session.create::<Post>();
    post.set("title", "queued");

    session.insert(&post, None).await?;
    assert_eq!(session.pending().await, 1);

    assert_eq!(session.query::<Post>().count().await?, 1);
    assert_eq!(session.pending().await, 0);

    Ok(())
}

#[tokio::test]
async fn without_autoflush_reads_see_only_flushed_writes() -> Result<()> {
    let store = InMemoryStore::new();
    let session = Session::builder(store.clone()).autoflush(false).build();
    let mut post = session.create::<Post>();
    post.set("title", "queued");

    session.insert(&post, Some(true)).await?;
    assert_eq!(session.query::<Post>().count().await?, 0);
    assert_eq!(store.len("posts").await, 0);

    session.flush().await?;
    assert_eq!(session.query::<Post>().count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn writes_apply_in_order() -> Result<()> {
    let session = Session::builder(InMemoryStore::new()).autoflush(false).build();
    let post = save_post(&session, "short lived", 1).await?;

    session.remove(&post, None).await?;
    let mut replacement = post.clone();
    replacement.set("title", "back again");
    session.insert(&replacement, None).await?;
    session.flush().await?;

    let stored = session.query::<Post>().get_or_fail(post.pk().unwrap()).await?;
    assert_eq!(stored.get_str("title"), Some("back again"));

    Ok(())
}

#[tokio::test]
async fn clear_discards_pending_writes() -> Result<()> {
    let session = Session::new(InMemoryStore::new());
    let mut post = session.create::<Post>();
    post.set("title", "never stored");

    session.insert(&post, None).await?;
    session.clear().await;

    assert_eq!(session.pending().await, 0);
    assert_eq!(session.query::<Post>().count().await?, 0);

    Ok(())
}

#[tokio::test]
async fn options_and_backend_access() -> Result<()> {
    let session = Session::builder(InMemoryStore::new()).safe(true).build();
    save_post(&session, "hello", 1).await?;

    assert!(session.safe());
    assert!(session.autoflush());

    let store = session
        .backend()
        .as_any()
        .downcast_ref::<InMemoryStore>()
        .expect("in-memory backend");
    assert_eq!(store.len("posts").await, 1);

    Ok(())
}

#[tokio::test]
async fn shutdown_requires_the_last_handle() -> Result<()> {
    let session = Session::new(InMemoryStore::new());
    let other = session.clone();

    assert!(session.shutdown().await.is_err());

    other.shutdown().await?;

    Ok(())
}

/// Memory store that refuses every write to one collection.
#[derive(Debug, Clone)]
struct RejectingStore {
    inner: InMemoryStore,
    rejected: &'static str,
}

#[async_trait::async_trait]
impl StoreBackend for RejectingStore {
    async fn upsert_document(
        &self,
        collection: &str,
        id: ObjectId,
        document: Document,
        safe: bool,
    ) -> DocumentStoreResult<()> {
        if collection == self.rejected {
            return Err(DocumentStoreError::Backend(format!("{collection} write rejected")));
        }
        StoreBackend::upsert_document(&self.inner, collection, id, document, safe).await
    }

    async fn delete_document(&self, collection: &str, id: ObjectId, safe: bool) -> DocumentStoreResult<()> {
        if collection == self.rejected {
            return Err(DocumentStoreError::Backend(format!("{collection} delete rejected")));
        }
        StoreBackend::delete_document(&self.inner, collection, id, safe).await
    }

    async fn query_documents(&self, collection: &str, selector: &Selector) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::query_documents(&self.inner, collection, selector).await
    }

    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(&self.inner, collection, filter).await
    }
}

fn rejecting_session(rejected: &'static str) -> (InMemoryStore, Session) {
    let inner = InMemoryStore::new();
    let session = Session::builder(RejectingStore { inner: inner.clone(), rejected })
        .autoflush(false)
        .build();
    (inner, session)
}

fn author(session: &Session) -> Model<Author> {
    let mut author = session.create::<Author>();
    author.set("name", "Ann").set("email", "ann@example.com");
    author
}

#[tokio::test]
async fn save_reports_only_its_own_write() -> Result<()> {
    let (store, session) = rejecting_session("authors");

    // One holder of the session queues a write the backend will refuse.
    session.insert(&author(&session), None).await?;

    // Another holder saves a valid model.
    let mut post = session.create::<Post>();
    post.set("title", "independent");
    post.save().await?;

    assert!(post.has_id());
    assert_eq!(store.len("posts").await, 1);
    assert_eq!(session.pending().await, 1);

    // The refused write is reported to whoever flushes the queue.
    let err = session.flush().await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::Backend(ref message) if message.contains("authors")));
    assert_eq!(session.pending().await, 0);

    Ok(())
}

#[tokio::test]
async fn failed_save_leaves_the_model_unsaved() -> Result<()> {
    let (store, session) = rejecting_session("authors");
    let mut author = author(&session);

    assert!(matches!(author.save().await.unwrap_err(), DocumentStoreError::Backend(_)));
    assert!(!author.has_id());
    assert_eq!(store.len("authors").await, 0);

    Ok(())
}

#[tokio::test]
async fn flush_stops_at_the_first_failure() -> Result<()> {
    let (store, session) = rejecting_session("authors");
    let mut post = session.create::<Post>();
    post.set("title", "after the failure");

    session.insert(&author(&session), None).await?;
    session.insert(&post, None).await?;

    assert!(session.flush().await.is_err());
    assert_eq!(session.pending().await, 0);
    assert_eq!(store.len("posts").await, 0);

    // Nothing left to apply.
    session.flush().await?;

    Ok(())
}

#[tokio::test]
async fn failed_remove_keeps_the_identity() -> Result<()> {
    let inner = InMemoryStore::new();
    let writer = Session::new(inner.clone());
    let mut saved = author(&writer);
    saved.save().await?;

    let session = Session::new(RejectingStore { inner: inner.clone(), rejected: "authors" });
    let mut loaded = session.query::<Author>().get_or_fail(saved.pk().unwrap()).await?;

    assert!(loaded.remove().await.is_err());
    assert!(loaded.has_id());
    assert_eq!(inner.len("authors").await, 1);

    Ok(())
}

#[tokio::test]
async fn forks_keep_separate_queues() -> Result<()> {
    let store = InMemoryStore::new();
    let session = Session::builder(store.clone()).autoflush(false).build();
    let request = session.fork();

    let mut post = request.create::<Post>();
    post.set("title", "request local");
    request.insert(&post, None).await?;

    assert_eq!(request.pending().await, 1);
    assert_eq!(session.pending().await, 0);

    session.flush().await?;
    assert_eq!(store.len("posts").await, 0);

    request.flush().await?;
    assert_eq!(session.query::<Post>().count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn shutdown_waits_for_forks() -> Result<()> {
    let session = Session::new(InMemoryStore::new());
    let request = session.fork();

    assert!(session.shutdown().await.is_err());

    request.shutdown().await?;

    Ok(())
}
