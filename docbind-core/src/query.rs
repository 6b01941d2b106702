//! Queries bound to a document type and a session.
//!
//! A [`Query`] is a reusable scope, closer to a cursor factory than a cursor.
//! Builder methods return a new query; executing methods read from the store
//! and leave the query untouched.
//!
//! ```ignore
//! use docbind::prelude::*;
//!
//! let published = session
//!     .query::<Post>()
//!     .filter(Field::new("published").eq(true))
//!     .sort("created", SortDirection::Desc);
//!
//! let page = published.paginate(2, 10, true).await?;
//! let post = published.get_or_fail("64b7f0c2a1e4d2b3c4d5e6f7").await?;
//! ```

use bson::Bson;
use std::{fmt, marker::PhantomData};
use tracing::debug;

use crate::{
    document::Model,
    error::{DocumentStoreError, DocumentStoreResult},
    filter::{Expr, Field, Selector, SortDirection, coerce_identity},
    page::{Pagination, PaginationParams},
    schema::Schema,
    session::Session,
};

/// A query scope over documents of type `S`.
pub struct Query<S: Schema> {
    session: Session,
    selector: Selector,
    _schema: PhantomData<fn() -> S>,
}

impl<S: Schema> Query<S> {
    /// A query matching every document of type `S`.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            selector: Selector::new(),
            _schema: PhantomData,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    fn derive(&self, selector: Selector) -> Self {
        Self {
            session: self.session.clone(),
            selector,
            _schema: PhantomData,
        }
    }

    /// Narrows the query; combined with existing filters using AND.
    pub fn filter(&self, expr: Expr) -> Self {
        self.derive(self.selector.clone().with_filter(expr))
    }

    /// Adds a sort key after any existing ones.
    pub fn sort(&self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.derive(self.selector.clone().with_sort(field, direction))
    }

    pub fn ascending(&self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Asc)
    }

    pub fn descending(&self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Desc)
    }

    pub fn skip(&self, skip: usize) -> Self {
        self.derive(self.selector.clone().with_skip(skip))
    }

    pub fn limit(&self, limit: usize) -> Self {
        self.derive(self.selector.clone().with_limit(limit))
    }

    /// Every matching document.
    pub async fn all(&self) -> DocumentStoreResult<Vec<Model<S>>> {
        self.session
            .execute(S::collection_name(), &self.selector)
            .await?
            .into_iter()
            .map(|document| Model::from_stored(self.session.clone(), document))
            .collect()
    }

    /// The first matching document, if any.
    pub async fn first(&self) -> DocumentStoreResult<Option<Model<S>>> {
        Ok(self.limit(1).all().await?.into_iter().next())
    }

    /// Number of matching documents. Skip and limit are ignored.
    pub async fn count(&self) -> DocumentStoreResult<u64> {
        self.session
            .count(S::collection_name(), self.selector.filter.as_ref())
            .await
    }

    /// Looks a document up by identity.
    ///
    /// `identity` may be an ObjectId or its hex string. A value that cannot
    /// be an identity at all is treated exactly like an unknown one.
    pub async fn get(&self, identity: impl Into<Bson>) -> DocumentStoreResult<Option<Model<S>>> {
        let identity = identity.into();

        let Some(id) = coerce_identity(&identity) else {
            debug!(collection = S::collection_name(), identity = %identity, "malformed identity, treating as not found");
            return Ok(None);
        };

        self.filter(Field::id().eq(id)).first().await
    }

    /// Like [`get`](Query::get) but fails with [`DocumentStoreError::NotFound`].
    pub async fn get_or_fail(&self, identity: impl Into<Bson>) -> DocumentStoreResult<Model<S>> {
        self.get(identity).await?.ok_or(DocumentStoreError::NotFound)
    }

    /// Like [`first`](Query::first) but fails with [`DocumentStoreError::NotFound`].
    pub async fn first_or_fail(&self) -> DocumentStoreResult<Model<S>> {
        self.first().await?.ok_or(DocumentStoreError::NotFound)
    }

    /// Returns page `page` (1-based) holding up to `per_page` documents.
    ///
    /// With `error_out`, fails with [`DocumentStoreError::NotFound`] for page 0,
    /// for a zero page size, and for an empty page past the first. Without it,
    /// page 0 is read as page 1 and a zero page size as the default size.
    /// An empty first page is a valid, empty result.
    ///
    /// The total is a separate count and may disagree with the slice under
    /// concurrent writes.
    pub async fn paginate(&self, page: usize, per_page: usize, error_out: bool) -> DocumentStoreResult<Pagination<S>> {
        if error_out && (page < 1 || per_page < 1) {
            return Err(DocumentStoreError::NotFound);
        }

        let params = PaginationParams::new(
            page.max(1),
            if per_page < 1 { PaginationParams::DEFAULT_PER_PAGE } else { per_page },
        );

        debug!(collection = S::collection_name(), page = params.page, per_page = params.per_page, "paginating");

        let items = self.skip(params.offset()).limit(params.per_page).all().await?;

        if items.is_empty() && params.page != 1 && error_out {
            return Err(DocumentStoreError::NotFound);
        }

        let total = self.count().await?;

        Ok(Pagination::new(self.clone(), params.page, params.per_page, total, items))
    }

    /// [`paginate`](Query::paginate) driven by request parameters.
    pub async fn paginate_with(&self, params: &PaginationParams) -> DocumentStoreResult<Pagination<S>> {
        self.paginate(params.page, params.per_page, params.error_out).await
    }
}

impl<S: Schema> Clone for Query<S> {
    fn clone(&self) -> Self {
        self.derive(self.selector.clone())
    }
}

impl<S: Schema> fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("collection", &S::collection_name())
            .field("selector", &self.selector)
            .finish()
    }
}
