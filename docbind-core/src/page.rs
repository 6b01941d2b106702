//! Pagination results and request parameters.
//!
//! [`Pagination`] is what [`Query::paginate`] returns: one page of models
//! plus what is needed to navigate. [`Page`] is its serializable export, for
//! handing to a response body. [`PaginationParams`] carries the page request.

use bson::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{document::Model, error::DocumentStoreResult, query::Query, schema::Schema};

/// One computed page of query results.
///
/// `total` is a snapshot taken when the page was read. Page counts are
/// derived from it and are not checked against the live store.
pub struct Pagination<S: Schema> {
    /// The query this page was cut from.
    pub query: Query<S>,
    /// Current page number, starting at 1.
    pub page: usize,
    /// Page size.
    pub per_page: usize,
    /// Total number of documents matching the query.
    pub total: u64,
    /// Documents on this page.
    pub items: Vec<Model<S>>,
}

impl<S: Schema> Pagination<S> {
    pub fn new(query: Query<S>, page: usize, per_page: usize, total: u64, items: Vec<Model<S>>) -> Self {
        Self { query, page, per_page, total, items }
    }

    /// Total number of pages.
    pub fn pages(&self) -> usize {
        page_count(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_num(&self) -> usize {
        self.page + 1
    }

    pub fn prev_num(&self) -> usize {
        self.page.saturating_sub(1)
    }

    /// Reads the next page from the originating query.
    pub async fn next(&self, error_out: bool) -> DocumentStoreResult<Pagination<S>> {
        self.query.paginate(self.next_num(), self.per_page, error_out).await
    }

    /// Reads the previous page from the originating query.
    ///
    /// From page 1 this asks for page 0, which fails with `error_out`.
    pub async fn prev(&self, error_out: bool) -> DocumentStoreResult<Pagination<S>> {
        self.query.paginate(self.prev_num(), self.per_page, error_out).await
    }

    /// Exports the page with every item serialized through
    /// [`Model::to_dict`] using `include`.
    pub fn to_page(&self, include: &[&str]) -> Page<Document> {
        Page::builder(self.items.iter().map(|item| item.to_dict(include)).collect())
            .with_count(self.total)
            .with_next_page(self.has_next().then(|| self.next_num()))
            .with_previous_page(self.has_prev().then(|| self.prev_num()))
            .build()
    }
}

impl<S: Schema> fmt::Debug for Pagination<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pagination")
            .field("page", &self.page)
            .field("per_page", &self.per_page)
            .field("total", &self.total)
            .field("items", &self.items.len())
            .finish()
    }
}

/// `ceil(total / per_page)`; zero when `per_page` is zero.
pub fn page_count(total: u64, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }

    let per_page = u64::try_from(per_page).unwrap_or(u64::MAX);
    usize::try_from(total.div_ceil(per_page)).unwrap_or(usize::MAX)
}

/// A serializable page of items with navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub count: u64,
    /// The next page number, if more pages exist.
    pub next_page: Option<usize>,
    /// The previous page number, if this is not the first page.
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    pub fn builder(items: Vec<T>) -> PageBuilder<T> {
        PageBuilder::new(items)
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Builder for [`Page`].
pub struct PageBuilder<T> {
    page: Page<T>,
}

impl<T> PageBuilder<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            page: Page { items, ..Page::default() },
        }
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.page.count = count;
        self
    }

    pub fn with_next_page(mut self, next_page: Option<usize>) -> Self {
        self.page.next_page = next_page;
        self
    }

    pub fn with_previous_page(mut self, previous_page: Option<usize>) -> Self {
        self.page.previous_page = previous_page;
        self
    }

    pub fn build(self) -> Page<T> {
        self.page
    }
}

/// A page request, typically parsed from query-string parameters.
///
/// Defaults to page 1, 20 items per page, failing on out-of-range pages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
    /// Whether out-of-range requests fail with not-found.
    pub error_out: bool,
}

impl PaginationParams {
    pub const DEFAULT_PER_PAGE: usize = 20;

    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page, error_out: true }
    }

    pub fn with_error_out(mut self, error_out: bool) -> Self {
        self.error_out = error_out;
        self
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: Self::DEFAULT_PER_PAGE,
            error_out: true,
        }
    }
}
