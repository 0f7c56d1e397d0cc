//! Backend session contract.
//!
//! A session is the driver-facing collaborator of a DAO: it executes
//! primitive reads and writes against one backend (a SQL pool, a document
//! store, ...). Sessions speak in rows and canonical filters; translation
//! from business objects happens before they are reached.

use crate::{Filter, GendaoResult, Interface, Row, Sorting};
use async_trait::async_trait;

/// What a backend can do natively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Offset/limit are applied by the backend itself.
    pub native_paging: bool,
    /// `insert_unless_exists` runs as one atomic unit.
    pub transactions: bool,
    /// Plain inserts are rejected on key conflicts (unique constraints).
    pub atomic_create: bool,
}

/// A read request against one table or collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Rows must match every predicate.
    pub filter: Filter,
    /// Empty means backend order.
    pub sorting: Sorting,
    /// Columns to read; empty or `["*"]` means all.
    pub columns: Vec<String>,
    /// Zero-based number of rows to skip.
    pub offset: usize,
    /// Maximum number of rows; `None` is unbounded.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query matching `filter`.
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sorted_by(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    /// Sets the column list.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the page window.
    #[must_use]
    pub fn page(mut self, offset: usize, limit: Option<usize>) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Returns `true` if the whole row set is requested.
    #[must_use]
    pub fn is_unpaged(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }
}

/// Primitive operations a DAO needs from a backend.
///
/// "No rows" is always reported as `0` or an empty vector, never as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendSession: Interface {
    /// Returns the native capabilities of this backend.
    fn capabilities(&self) -> Capabilities;

    /// Inserts a row.
    ///
    /// Sessions advertising `atomic_create` must fail with
    /// [`crate::GendaoError::DuplicatedEntry`] on key conflicts.
    async fn insert(&self, table: &str, row: Row) -> GendaoResult<()>;

    /// Inserts `row` only if nothing matches `filter`.
    ///
    /// Returns `false` when a matching row already exists. The default is a
    /// read followed by a write and is not atomic; sessions advertising
    /// `transactions` override it.
    async fn insert_unless_exists(&self, table: &str, filter: &Filter, row: Row) -> GendaoResult<bool> {
        let lookup = Query::new(filter.clone()).page(0, Some(1));
        if !self.query(table, &lookup).await?.is_empty() {
            return Ok(false);
        }
        self.insert(table, row).await?;
        Ok(true)
    }

    /// Replaces the rows matching `filter` with `row`.
    ///
    /// With `upsert` the row is inserted when nothing matches. Returns the
    /// number of rows written.
    async fn replace(&self, table: &str, filter: &Filter, row: Row, upsert: bool) -> GendaoResult<usize>;

    /// Removes the rows matching `filter`, returning how many were removed.
    async fn delete(&self, table: &str, filter: &Filter) -> GendaoResult<usize>;

    /// Reads the rows selected by `query`.
    async fn query(&self, table: &str, query: &Query) -> GendaoResult<Vec<Row>>;
}
