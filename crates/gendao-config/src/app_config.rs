//! Configuration structures.

use crate::SqlFlavor;
use gendao_core::{GendaoResult, GenericRowMapper, NameTransformation, TelemetryConfig, TranslationTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GendaoConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Relational backend configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Row mapper configuration.
    #[serde(default)]
    pub mapper: RowMapperConfig,

    /// DAO behaviour and storages.
    #[serde(default)]
    pub dao: DaoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl GendaoConfig {
    /// Renders the effective configuration as TOML.
    pub fn to_toml(&self) -> GendaoResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| gendao_core::GendaoError::configuration(format!("Cannot render configuration: {}", e)))
    }
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "gendao".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL.
    pub url: String,
    /// SQL flavor; resolved from the URL scheme when unset.
    pub flavor: Option<SqlFlavor>,
    /// Minimum connection pool size.
    pub min_connections: u32,
    /// Maximum connection pool size.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Log every statement at debug level.
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            flavor: None,
            min_connections: 1,
            max_connections: 10,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            log_queries: false,
        }
    }
}

impl DatabaseConfig {
    /// Returns the configured flavor, or the one implied by the URL.
    pub fn resolved_flavor(&self) -> GendaoResult<SqlFlavor> {
        match self.flavor {
            Some(flavor) => Ok(flavor),
            None => SqlFlavor::from_url(&self.url),
        }
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the idle timeout as a Duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Row mapper configuration (`[mapper]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RowMapperConfig {
    /// Default case transformation of names.
    pub name_transformation: NameTransformation,
    /// Storage id (or `*`) -> business object field -> column.
    pub gbo_field_to_col_name: TranslationTable,
    /// Storage id (or `*`) -> column -> business object field.
    pub col_name_to_gbo_field: TranslationTable,
    /// Storage id -> columns to read.
    pub columns: HashMap<String, Vec<String>>,
}

impl RowMapperConfig {
    /// Builds the configured row mapper.
    #[must_use]
    pub fn build(&self) -> GenericRowMapper {
        self.columns.iter().fold(
            GenericRowMapper::new()
                .with_name_transformation(self.name_transformation)
                .with_gbo_field_to_col_name(self.gbo_field_to_col_name.clone())
                .with_col_name_to_gbo_field(self.col_name_to_gbo_field.clone()),
            |mapper, (storage, columns)| mapper.with_columns(storage.clone(), columns.clone()),
        )
    }
}

/// DAO configuration (`[dao]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Start DAOs with transactional `create`.
    pub tx_mode: bool,
    /// Storage id -> physical layout.
    pub storages: HashMap<String, StorageConfig>,
}

impl DaoConfig {
    /// Storage id -> physical table, for storages that rename it.
    #[must_use]
    pub fn tables(&self) -> HashMap<String, String> {
        self.storages
            .iter()
            .filter_map(|(id, storage)| storage.table.clone().map(|table| (id.clone(), table)))
            .collect()
    }

    /// Storage id -> primary-key columns.
    #[must_use]
    pub fn primary_keys(&self) -> HashMap<String, Vec<String>> {
        self.storages
            .iter()
            .map(|(id, storage)| (id.clone(), storage.primary_key.clone()))
            .collect()
    }
}

/// Physical layout of one storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Physical table or collection; defaults to the storage id.
    pub table: Option<String>,
    /// Columns identifying a row.
    pub primary_key: Vec<String>,
}
