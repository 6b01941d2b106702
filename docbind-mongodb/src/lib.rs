//! MongoDB backend implementation for docbind.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters are translated to MongoDB query documents and executed server-side;
//! the session's `safe` flag selects the write concern of each write.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docbind = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The backend is built either from an explicit connection string or from the
//! application's [`Settings`](docbind_core::config::Settings):
//!
//! ```ignore
//! use docbind::{backend::StoreBackendBuilder, config::{EnvSettings, Settings}, mongodb::MongoDbStore};
//!
//! let settings = Settings::from_source(&EnvSettings)?;
//! let store = MongoDbStore::from_settings(&settings)?.build().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_mongodb;

pub mod store;
pub(crate) mod query;
pub(crate) mod sanitizer;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
