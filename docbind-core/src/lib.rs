//! Core of docbind: document-store backed models for request-serving applications.
//!
//! This crate provides:
//!
//! - **Settings** ([`config`]) - Store connection settings read from the host application
//! - **Errors** ([`error`]) - Error types, including the not-found and bad-request conditions
//! - **Filters** ([`filter`]) - Filter expressions and the selector executed by backends
//! - **Backends** ([`backend`]) - Traits implemented by storage backends
//! - **Sessions** ([`session`]) - Explicit store handles with a queue of pending writes
//! - **Schemas** ([`schema`]) - Declared fields and computed attributes of a document type
//! - **Models** ([`document`]) - The base document type: persistence, identity, serialization
//! - **Queries** ([`query`]) - Lookups, or-fail variants and pagination
//! - **Pages** ([`page`]) - Pagination results and request parameters
//!
//! # Example
//!
//! ```ignore
//! use docbind::prelude::*;
//! use docbind::memory::InMemoryStore;
//!
//! struct User;
//!
//! impl Schema for User {
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn fields() -> Vec<FieldDef> {
//!         vec![FieldDef::new("name", FieldKind::String)]
//!     }
//! }
//!
//! let session = Session::new(InMemoryStore::new());
//! let mut user = session.create::<User>();
//! user.set("name", "Alice");
//! user.save().await?;
//!
//! let found = session.query::<User>().get_or_fail(user.pk().unwrap()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docbind_core;

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod page;
pub mod query;
pub mod schema;
pub mod session;
