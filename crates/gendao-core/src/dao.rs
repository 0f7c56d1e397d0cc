//! The generic DAO contract and its shared orchestration.
//!
//! [`GenericDao`] is what application code talks to. Concrete DAOs own a
//! [`DaoBase`] (session, row mapper, storage mapping and tx flag) and only
//! decide how a business object is identified, via `create_filter`; every
//! other operation delegates to the base.

use crate::mapper::RowMapper;
use crate::session::{BackendSession, Query};
use crate::{Filter, FilterInput, GendaoError, GendaoResult, GenericBo, Interface, Row, Sorting, SortingInput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Storage-agnostic CRUD over [`GenericBo`]s.
///
/// Counts are `0` or `1` for single-object operations. Absence of a match is
/// never an error.
#[async_trait]
pub trait GenericDao: Interface {
    /// Builds the filter identifying `bo` within `storage_id`.
    fn create_filter(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<Filter>;

    /// Inserts `bo` if nothing matches its filter.
    ///
    /// Fails with [`GendaoError::DuplicatedEntry`] on conflict and never
    /// overwrites.
    async fn create(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize>;

    /// Replaces the stored object matching `bo`; never inserts.
    async fn update(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize>;

    /// Replaces or inserts `bo`.
    async fn save(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize>;

    /// Removes the stored object matching `bo`.
    async fn delete(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize>;

    /// Removes every object matching `filter`.
    async fn delete_many(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<usize>;

    /// Reads one object matching `filter`.
    async fn fetch_one(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<Option<GenericBo>>;

    /// Reads a page of objects.
    ///
    /// A missing filter matches everything, a missing sorting keeps backend
    /// order and `num_items <= 0` means no limit.
    async fn fetch_many(
        &self,
        storage_id: &str,
        filter: Option<FilterInput>,
        sorting: Option<SortingInput>,
        start_offset: usize,
        num_items: i64,
    ) -> GendaoResult<Vec<GenericBo>>;

    /// Toggles transactional `create`.
    fn enable_tx_mode(&self, enabled: bool);

    /// Returns whether transactional `create` is active.
    fn tx_mode(&self) -> bool;
}

/// Shared state and orchestration for [`GenericDao`] implementations.
pub struct DaoBase {
    session: Arc<dyn BackendSession>,
    mapper: Arc<dyn RowMapper>,
    tables: HashMap<String, String>,
    tx_mode: AtomicBool,
}

impl std::fmt::Debug for DaoBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaoBase")
            .field("capabilities", &self.session.capabilities())
            .field("tables", &self.tables)
            .field("tx_mode", &self.tx_mode())
            .finish_non_exhaustive()
    }
}

impl DaoBase {
    /// Creates a base over a session and a row mapper.
    pub fn new(session: Arc<dyn BackendSession>, mapper: Arc<dyn RowMapper>) -> Self {
        Self {
            session,
            mapper,
            tables: HashMap::new(),
            tx_mode: AtomicBool::new(false),
        }
    }

    /// Maps storage ids to physical table/collection names.
    #[must_use]
    pub fn with_tables(mut self, tables: HashMap<String, String>) -> Self {
        self.tables = tables;
        self
    }

    /// Maps one storage id to a physical table/collection name.
    #[must_use]
    pub fn with_table(mut self, storage_id: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(storage_id.into(), table.into());
        self
    }

    /// Returns the backend session.
    pub fn session(&self) -> &Arc<dyn BackendSession> {
        &self.session
    }

    /// Returns the row mapper.
    pub fn mapper(&self) -> &Arc<dyn RowMapper> {
        &self.mapper
    }

    /// Resolves the physical name of a storage; unmapped ids are used as-is.
    pub fn table_for<'a>(&'a self, storage_id: &'a str) -> &'a str {
        self.tables.get(storage_id).map_or(storage_id, String::as_str)
    }

    /// Turns transactional `create` on or off.
    ///
    /// Stays off for sessions without transactions.
    pub fn enable_tx_mode(&self, enabled: bool) {
        let supported = self.session.capabilities().transactions;
        if enabled && !supported {
            debug!("Backend has no transactions, tx mode left disabled");
        }
        self.tx_mode.store(enabled && supported, Ordering::SeqCst);
    }

    /// Returns whether transactional `create` is active.
    pub fn tx_mode(&self) -> bool {
        self.tx_mode.load(Ordering::SeqCst)
    }

    /// Maps `bo` into the row written to `storage_id`.
    pub fn row_for(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<Row> {
        self.mapper
            .to_row(storage_id, Some(bo))?
            .ok_or_else(|| GendaoError::translation(format!("No row produced for storage '{}'", storage_id)))
    }

    /// Inserts `bo` unless `filter` already matches.
    pub async fn create(&self, storage_id: &str, filter: &Filter, bo: &GenericBo) -> GendaoResult<usize> {
        let table = self.table_for(storage_id);
        let row = self.row_for(storage_id, bo)?;
        let capabilities = self.session.capabilities();

        if self.tx_mode() && capabilities.transactions {
            debug!(table, "Creating inside a transaction");
            if !self.session.insert_unless_exists(table, filter, row).await? {
                return Err(GendaoError::DuplicatedEntry);
            }
        } else if capabilities.atomic_create {
            debug!(table, "Creating with backend uniqueness");
            self.session.insert(table, row).await?;
        } else {
            // Not atomic: a concurrent writer may slip in between.
            debug!(table, "Creating with read-then-write");
            if self.exists(table, filter).await? {
                return Err(GendaoError::DuplicatedEntry);
            }
            self.session.insert(table, row).await?;
        }
        Ok(1)
    }

    /// Replaces the row matching `filter`; never inserts.
    pub async fn update(&self, storage_id: &str, filter: &Filter, bo: &GenericBo) -> GendaoResult<usize> {
        let table = self.table_for(storage_id);
        let row = self.row_for(storage_id, bo)?;
        let written = self.session.replace(table, filter, row, false).await?;
        debug!(table, written, "Updated");
        Ok(written.min(1))
    }

    /// Replaces or inserts the row matching `filter`.
    pub async fn save(&self, storage_id: &str, filter: &Filter, bo: &GenericBo) -> GendaoResult<usize> {
        let table = self.table_for(storage_id);
        let row = self.row_for(storage_id, bo)?;
        let written = self.session.replace(table, filter, row, true).await?;
        debug!(table, written, "Saved");
        Ok(1)
    }

    /// Removes the row matching `filter`, reporting at most one.
    pub async fn delete(&self, storage_id: &str, filter: &Filter) -> GendaoResult<usize> {
        Ok(self.delete_many(storage_id, filter.clone().into()).await?.min(1))
    }

    /// Removes every row matching `filter`.
    pub async fn delete_many(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<usize> {
        let filter = filter.normalize()?;
        let table = self.table_for(storage_id);
        let removed = self.session.delete(table, &filter).await?;
        debug!(table, removed, "Deleted");
        Ok(removed)
    }

    /// Reads the first row matching `filter`.
    pub async fn fetch_one(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<Option<GenericBo>> {
        let query = Query::new(filter.normalize()?)
            .columns(self.mapper.columns_list(storage_id))
            .page(0, Some(1));
        let rows = self.session.query(self.table_for(storage_id), &query).await?;
        match rows.first() {
            Some(row) => self.mapper.to_bo(storage_id, Some(row)),
            None => Ok(None),
        }
    }

    /// Reads a page of rows; paging is done here when the backend cannot.
    pub async fn fetch_many(
        &self,
        storage_id: &str,
        filter: Option<FilterInput>,
        sorting: Option<SortingInput>,
        start_offset: usize,
        num_items: i64,
    ) -> GendaoResult<Vec<GenericBo>> {
        let filter = filter.map(FilterInput::normalize).transpose()?.unwrap_or_default();
        let sorting = sorting.map(SortingInput::normalize).transpose()?.unwrap_or_default();
        let limit = usize::try_from(num_items).ok().filter(|n| *n > 0);
        let table = self.table_for(storage_id);
        let query = Query::new(filter)
            .sorted_by(sorting)
            .columns(self.mapper.columns_list(storage_id));

        let rows = if self.session.capabilities().native_paging {
            self.session.query(table, &query.page(start_offset, limit)).await?
        } else {
            let rows = self.session.query(table, &query).await?;
            if start_offset > 0 || limit.is_some() {
                debug!(table, start_offset, ?limit, "Backend lacks native paging, paging client-side");
            }
            rows.into_iter()
                .skip(start_offset)
                .take(limit.unwrap_or(usize::MAX))
                .collect()
        };
        debug!(table, rows = rows.len(), "Fetched");

        rows.iter()
            .filter_map(|row| self.mapper.to_bo(storage_id, Some(row)).transpose())
            .collect()
    }

    async fn exists(&self, table: &str, filter: &Filter) -> GendaoResult<bool> {
        let lookup = Query::new(filter.clone()).page(0, Some(1));
        Ok(!self.session.query(table, &lookup).await?.is_empty())
    }
}

/// Sorting helper for sessions that order rows in memory.
pub fn sort_rows(rows: &mut [serde_json::Map<String, serde_json::Value>], sorting: &Sorting) {
    if !sorting.is_empty() {
        rows.sort_by(|a, b| sorting.compare(a, b));
    }
}
