//! Configuration-driven DAO identifying objects by primary-key columns.

use async_trait::async_trait;
use gendao_config::DaoConfig;
use gendao_core::{
    BackendSession, DaoBase, Filter, FilterInput, GendaoError, GendaoResult, GenericBo, GenericDao, RowMapper,
    SortingInput,
};
use std::collections::HashMap;
use std::sync::Arc;

/// [`GenericDao`] whose filters select the primary-key columns of a storage.
///
/// The key is read from the mapped row, so filters are expressed in column
/// names and work unchanged whatever translation the row mapper applies.
#[derive(Debug)]
pub struct KeyedDao {
    base: DaoBase,
    primary_keys: HashMap<String, Vec<String>>,
}

impl KeyedDao {
    /// Creates a DAO without any storage registered.
    pub fn new(session: Arc<dyn BackendSession>, mapper: Arc<dyn RowMapper>) -> Self {
        Self {
            base: DaoBase::new(session, mapper),
            primary_keys: HashMap::new(),
        }
    }

    /// Creates a DAO for every storage of the `[dao]` section.
    ///
    /// Transactional `create` is switched on when `tx_mode` is set and the
    /// session supports it.
    pub fn from_config(session: Arc<dyn BackendSession>, mapper: Arc<dyn RowMapper>, config: &DaoConfig) -> Self {
        let dao = Self {
            base: DaoBase::new(session, mapper).with_tables(config.tables()),
            primary_keys: config.primary_keys(),
        };
        dao.base.enable_tx_mode(config.tx_mode);
        dao
    }

    /// Registers a storage by its primary-key columns.
    #[must_use]
    pub fn with_storage<I, S>(mut self, storage_id: impl Into<String>, primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys
            .insert(storage_id.into(), primary_key.into_iter().map(Into::into).collect());
        self
    }

    /// Stores a storage id under another physical table name.
    #[must_use]
    pub fn with_table(mut self, storage_id: impl Into<String>, table: impl Into<String>) -> Self {
        self.base = self.base.with_table(storage_id, table);
        self
    }

    /// Returns the shared orchestration.
    pub fn base(&self) -> &DaoBase {
        &self.base
    }
}

#[async_trait]
impl GenericDao for KeyedDao {
    fn create_filter(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<Filter> {
        let keys = self.primary_keys.get(storage_id).ok_or_else(|| {
            GendaoError::configuration(format!("No primary key configured for storage '{}'", storage_id))
        })?;
        let columns = self
            .base
            .row_for(storage_id, bo)?
            .to_map()?
            .unwrap_or_default();

        keys.iter().try_fold(Filter::new(), |filter, key| -> GendaoResult<Filter> {
            let value = columns.get(key).cloned().ok_or_else(|| {
                GendaoError::translation(format!(
                    "Primary key column '{}' of storage '{}' is missing",
                    key, storage_id
                ))
            })?;
            Ok(filter.with(key.clone(), value))
        })
    }

    async fn create(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize> {
        let filter = self.create_filter(storage_id, bo)?;
        self.base.create(storage_id, &filter, bo).await
    }

    async fn update(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize> {
        let filter = self.create_filter(storage_id, bo)?;
        self.base.update(storage_id, &filter, bo).await
    }

    async fn save(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize> {
        let filter = self.create_filter(storage_id, bo)?;
        self.base.save(storage_id, &filter, bo).await
    }

    async fn delete(&self, storage_id: &str, bo: &GenericBo) -> GendaoResult<usize> {
        let filter = self.create_filter(storage_id, bo)?;
        self.base.delete(storage_id, &filter).await
    }

    async fn delete_many(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<usize> {
        self.base.delete_many(storage_id, filter).await
    }

    async fn fetch_one(&self, storage_id: &str, filter: FilterInput) -> GendaoResult<Option<GenericBo>> {
        self.base.fetch_one(storage_id, filter).await
    }

    async fn fetch_many(
        &self,
        storage_id: &str,
        filter: Option<FilterInput>,
        sorting: Option<SortingInput>,
        start_offset: usize,
        num_items: i64,
    ) -> GendaoResult<Vec<GenericBo>> {
        self.base
            .fetch_many(storage_id, filter, sorting, start_offset, num_items)
            .await
    }

    fn enable_tx_mode(&self, enabled: bool) {
        self.base.enable_tx_mode(enabled);
    }

    fn tx_mode(&self) -> bool {
        self.base.tx_mode()
    }
}
