//! Convenient re-exports of commonly used types from docbind.
//!
//! ```ignore
//! use docbind::prelude::*;
//! ```

pub use docbind_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    config::{EnvSettings, Settings, SettingsSource},
    document::Model,
    error::{DocumentStoreError, DocumentStoreResult, ValidationError},
    filter::{Expr, Field, FieldOp, Selector, Sort, SortDirection},
    page::{Page, Pagination, PaginationParams},
    query::Query,
    schema::{FieldDef, FieldKind, Schema, Virtual},
    session::Session,
};
