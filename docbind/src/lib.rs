//! Main docbind crate: document-store backed models for request handlers.
//!
//! This crate is the primary entry point. It re-exports the core types from
//! the sub-crates and gives access to the storage backends.
//!
//! # Features
//!
//! - **Schema-checked models** - Declare fields and computed attributes once, validate on every save
//! - **Request-shaped lookups** - `get_or_fail`, `first_or_fail` and `maybe_save` map onto 404 and 400 answers
//! - **Pagination** - Page objects with navigation and a serializable export
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docbind::{prelude::*, memory::InMemoryStore};
//!
//! struct Post;
//!
//! impl Schema for Post {
//!     fn collection_name() -> &'static str { "posts" }
//!
//!     fn fields() -> Vec<FieldDef> {
//!         vec![
//!             FieldDef::new("title", FieldKind::String),
//!             FieldDef::new("published", FieldKind::Bool).with_default(false),
//!         ]
//!     }
//!
//!     fn virtuals() -> Vec<Virtual<Self>> {
//!         vec![Virtual::new("slug", |post| {
//!             post.get_str("title").unwrap_or_default().to_lowercase().replace(' ', "-").into()
//!         })]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let session = Session::new(InMemoryStore::new());
//!
//!     let mut post = session.create::<Post>();
//!     post.set("title", "Hello World");
//!     post.maybe_save().await?;
//!
//!     // In a handler, NotFound becomes a 404.
//!     let found = session.query::<Post>().get_or_fail(post.pk().unwrap()).await?;
//!     println!("{}", found.to_json(&["title", "slug"])?);
//!
//!     let page = session
//!         .query::<Post>()
//!         .filter(Field::new("published").eq(false))
//!         .paginate(1, 20, true)
//!         .await?;
//!     println!("{} of {}", page.items.len(), page.total);
//!
//!     session.shutdown().await
//! }
//! ```
//!
//! # Connecting from settings
//!
//! With the `mongodb` feature, [`connect`] reads the connection from
//! [`Settings`](config::Settings) and returns a session whose default write
//! acknowledgment follows `safe_session`:
//!
//! ```ignore
//! use docbind::config::{EnvSettings, Settings};
//!
//! let settings = Settings::from_source(&EnvSettings)?;
//! let session = docbind::connect(&settings).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docbind_core::{backend, config, document, error, filter, page, query, schema, session};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docbind_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docbind_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}

#[cfg(feature = "mongodb")]
pub use connection::connect;

#[cfg(feature = "mongodb")]
mod connection {
    use docbind_core::{
        backend::StoreBackendBuilder,
        config::Settings,
        error::DocumentStoreResult,
        session::Session,
    };
    use docbind_mongodb::MongoDbStoreBuilder;
    use tracing::info;

    /// Opens a MongoDB-backed session configured by `settings`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no database is named, or an
    /// initialization error when the connection string is rejected.
    pub async fn connect(settings: &Settings) -> DocumentStoreResult<Session> {
        let backend = MongoDbStoreBuilder::from_settings(settings)?.build().await?;

        info!(database = %settings.database, safe = settings.safe_session, "document store session ready");

        Ok(Session::builder(backend).safe(settings.safe_session).build())
    }
}
