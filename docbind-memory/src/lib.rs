//! In-memory document storage backend for docbind.
//!
//! [`InMemoryStore`] keeps every collection in process memory behind an
//! async-aware read-write lock. It evaluates filters, multi-key sorts, skip
//! and limit itself, so sessions backed by it behave like sessions backed by
//! a real store. Useful for tests and local development.
//!
//! # Quick Start
//!
//! ```ignore
//! use docbind::{memory::InMemoryStore, session::Session};
//!
//! let session = Session::new(InMemoryStore::new());
//! let mut post = session.create::<Post>();
//! post.set("title", "hello");
//! post.save().await?;
//!
//! assert_eq!(session.query::<Post>().count().await?, 1);
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_memory;

pub mod store;
pub(crate) mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use docbind_core::{
        backend::{StoreBackend, StoreBackendBuilder},
        filter::{Field, Selector, SortDirection},
    };

    use super::*;

    async fn seeded() -> (InMemoryStore, Vec<ObjectId>) {
        let store = InMemoryStore::builder().build().await.unwrap();
        let mut ids = Vec::new();

        for (name, rank) in [("c", 2), ("a", 1), ("b", 2), ("d", 0)] {
            let id = ObjectId::new();
            store
                .upsert_document("items", id, doc! { "name": name, "rank": rank }, false)
                .await
                .unwrap();
            ids.push(id);
        }

        (store, ids)
    }

    fn names(documents: &[bson::Document]) -> Vec<&str> {
        documents.iter().map(|d| d.get_str("name").unwrap()).collect()
    }

    #[tokio::test]
    async fn unsorted_queries_keep_insertion_order() {
        let (store, ids) = seeded().await;

        let documents = store.query_documents("items", &Selector::default()).await.unwrap();

        assert_eq!(names(&documents), vec!["c", "a", "b", "d"]);
        assert_eq!(documents[0].get_object_id("_id").unwrap(), ids[0]);
    }

    #[tokio::test]
    async fn sort_skip_and_limit() {
        let (store, _) = seeded().await;

        let selector = Selector::default()
            .with_sort("rank", SortDirection::Desc)
            .with_sort("name", SortDirection::Asc)
            .with_skip(1)
            .with_limit(2);

        let documents = store.query_documents("items", &selector).await.unwrap();

        assert_eq!(names(&documents), vec!["c", "a"]);
    }

    #[tokio::test]
    async fn filter_and_count() {
        let (store, _) = seeded().await;
        let filter = Field::new("rank").gte(1);

        let documents = store
            .query_documents("items", &Selector::default().with_filter(filter.clone()))
            .await
            .unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(store.count_documents("items", Some(&filter)).await.unwrap(), 3);
        assert_eq!(store.count_documents("items", None).await.unwrap(), 4);
        assert_eq!(store.count_documents("missing", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_is_idempotent() {
        let (store, ids) = seeded().await;

        store
            .upsert_document("items", ids[1], doc! { "name": "renamed" }, true)
            .await
            .unwrap();

        let documents = store
            .query_documents("items", &Selector::default().with_filter(Field::id().eq(ids[1])))
            .await
            .unwrap();
        assert_eq!(documents, vec![doc! { "name": "renamed", "_id": ids[1] }]);

        store.delete_document("items", ids[1], true).await.unwrap();
        store.delete_document("items", ids[1], true).await.unwrap();
        store.delete_document("unknown", ids[1], true).await.unwrap();

        assert_eq!(store.len("items").await, 3);
        assert_eq!(store.collections().await, vec!["items".to_string()]);
    }

    #[tokio::test]
    async fn insertion_order_does_not_follow_identities() {
        let store = InMemoryStore::new();
        let ids = [[9; 12], [5; 12], [1; 12]].map(ObjectId::from_bytes);

        for (id, name) in ids.iter().zip(["first", "second", "third"]) {
            store
                .upsert_document("items", *id, doc! { "name": name }, false)
                .await
                .unwrap();
        }
        store
            .upsert_document("items", ids[0], doc! { "name": "replaced" }, false)
            .await
            .unwrap();
        store.delete_document("items", ids[1], false).await.unwrap();
        store
            .upsert_document("items", ids[1], doc! { "name": "again" }, false)
            .await
            .unwrap();

        let documents = store.query_documents("items", &Selector::default()).await.unwrap();

        assert_eq!(names(&documents), vec!["replaced", "third", "again"]);
    }
}
