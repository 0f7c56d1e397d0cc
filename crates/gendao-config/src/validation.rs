//! Configuration validation.
//!
//! All problems are collected before failing so that a broken configuration
//! is reported in one go.

use crate::{DaoConfig, DatabaseConfig, GendaoConfig, RowMapperConfig, SqlFlavor};
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { message: String },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// A storage has no primary-key columns.
    MissingPrimaryKey { storage: String },
    /// A storage maps to an empty table name.
    EmptyTableName { storage: String },
    /// A column list is configured but empty.
    EmptyColumnList { storage: String },
    /// The log filter is empty while logging is enabled.
    EmptyLogFilter,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { message } => write!(f, "Invalid database URL: {}", message),
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::MissingPrimaryKey { storage } => {
                write!(f, "Storage '{}' has no primary key columns", storage)
            }
            Self::EmptyTableName { storage } => {
                write!(f, "Storage '{}' maps to an empty table name", storage)
            }
            Self::EmptyColumnList { storage } => {
                write!(f, "Column list of storage '{}' is empty", storage)
            }
            Self::EmptyLogFilter => write!(f, "Log filter cannot be empty when telemetry is enabled"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;

    /// Validates the whole configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &GendaoConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_database(&config.database, &mut errors);
        Self::validate_mapper(&config.mapper, &mut errors);
        Self::validate_dao(&config.dao, &mut errors);
        if config.telemetry.enabled && config.telemetry.filter.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyLogFilter);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_database(config: &DatabaseConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.url.is_empty() {
            errors.push(ConfigValidationError::InvalidUrl {
                message: "URL cannot be empty".to_string(),
            });
        } else if config.flavor.is_none() {
            if let Err(e) = SqlFlavor::from_url(&config.url) {
                errors.push(ConfigValidationError::InvalidUrl {
                    message: e.to_string(),
                });
            }
        }

        if config.min_connections > config.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.idle_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.idle_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_mapper(config: &RowMapperConfig, errors: &mut Vec<ConfigValidationError>) {
        let mut storages: Vec<&String> = config
            .columns
            .iter()
            .filter(|(_, columns)| columns.is_empty())
            .map(|(storage, _)| storage)
            .collect();
        storages.sort();
        errors.extend(storages.into_iter().map(|storage| ConfigValidationError::EmptyColumnList {
            storage: storage.clone(),
        }));
    }

    fn validate_dao(config: &DaoConfig, errors: &mut Vec<ConfigValidationError>) {
        let mut storages: Vec<_> = config.storages.iter().collect();
        storages.sort_by(|a, b| a.0.cmp(b.0));

        for (id, storage) in storages {
            if storage.primary_key.is_empty() || storage.primary_key.iter().any(|c| c.trim().is_empty()) {
                errors.push(ConfigValidationError::MissingPrimaryKey { storage: id.clone() });
            }
            if storage.table.as_deref().is_some_and(|t| t.trim().is_empty()) {
                errors.push(ConfigValidationError::EmptyTableName { storage: id.clone() });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageConfig;
    use std::collections::HashMap;

    fn storage(table: Option<&str>, keys: &[&str]) -> StorageConfig {
        StorageConfig {
            table: table.map(str::to_string),
            primary_key: keys.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&GendaoConfig::default()).is_ok());
    }

    #[test]
    fn test_database_errors() {
        let mut config = GendaoConfig::default();
        config.database.url = "ftp://somewhere".to_string();
        config.database.min_connections = 3000;
        config.database.max_connections = 2000;
        config.database.idle_timeout_secs = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ConfigValidationError::InvalidUrl { .. }));
        assert!(errors.contains(&ConfigValidationError::PoolSizeTooLarge {
            value: 2000,
            maximum: 1000
        }));
    }

    #[test]
    fn test_explicit_flavor_skips_scheme_check() {
        let mut config = GendaoConfig::default();
        config.database.url = "custom-driver://db".to_string();
        config.database.flavor = Some(SqlFlavor::Postgres);
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_storage_errors() {
        let mut config = GendaoConfig::default();
        config.dao.storages = HashMap::from([
            ("a".to_string(), storage(Some("t_a"), &["id"])),
            ("b".to_string(), storage(None, &[])),
            ("c".to_string(), storage(Some(" "), &["id", ""])),
        ]);
        config.mapper.columns.insert("a".to_string(), Vec::new());

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigValidationError::EmptyColumnList { storage: "a".to_string() },
                ConfigValidationError::MissingPrimaryKey { storage: "b".to_string() },
                ConfigValidationError::MissingPrimaryKey { storage: "c".to_string() },
                ConfigValidationError::EmptyTableName { storage: "c".to_string() },
            ]
        );
    }

    #[test]
    fn test_empty_log_filter() {
        let mut config = GendaoConfig::default();
        config.telemetry.filter = String::new();
        assert_eq!(
            ConfigValidator::validate(&config).unwrap_err(),
            vec![ConfigValidationError::EmptyLogFilter]
        );
        config.telemetry.enabled = false;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_error_messages() {
        let err = ConfigValidationError::MissingPrimaryKey {
            storage: "users".to_string(),
        };
        assert_eq!(err.to_string(), "Storage 'users' has no primary key columns");
    }
}
