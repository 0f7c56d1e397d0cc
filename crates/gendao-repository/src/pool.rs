//! Database connection pool management.

use async_trait::async_trait;
use gendao_config::{DatabaseConfig, SqlFlavor};
use gendao_core::{GendaoError, GendaoResult, Interface};
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{AnyPool, ConnectOptions};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Interface for database pool operations.
#[async_trait]
pub trait DatabasePoolInterface: Interface {
    /// Returns a reference to the underlying pool.
    fn inner(&self) -> &AnyPool;

    /// Returns the SQL flavor of the connected database.
    fn flavor(&self) -> SqlFlavor;

    /// Checks if the database connection is healthy.
    async fn health_check(&self) -> GendaoResult<()>;

    /// Closes the database pool.
    async fn close(&self);
}

/// Database pool wrapper over any supported driver.
pub struct DatabasePool {
    pool: AnyPool,
    flavor: SqlFlavor,
}

impl DatabasePool {
    /// Creates a new database pool from configuration.
    pub async fn new(config: &DatabaseConfig) -> GendaoResult<Self> {
        sqlx::any::install_default_drivers();
        let flavor = config.resolved_flavor()?;
        info!("Connecting to {} database...", flavor);

        let mut options = AnyConnectOptions::from_str(&config.url)
            .map_err(|e| GendaoError::configuration(format!("Invalid database URL: {}", e)))?;
        if !config.log_queries {
            options = options.disable_statement_logging();
        }

        let pool = AnyPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                GendaoError::backend(e)
            })?;

        info!("{} connection pool established", flavor);
        Ok(Self { pool, flavor })
    }

    /// Creates DatabasePool with a pre-existing pool.
    #[must_use]
    pub fn with_pool(pool: AnyPool, flavor: SqlFlavor) -> Self {
        Self { pool, flavor }
    }

    /// Returns a reference to the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the SQL flavor of the connected database.
    #[must_use]
    pub fn flavor(&self) -> SqlFlavor {
        self.flavor
    }

    /// Checks if the database connection is healthy.
    pub async fn health_check(&self) -> GendaoResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| GendaoError::backend(anyhow_context("Health check failed", e)))?;
        Ok(())
    }

    /// Closes the database pool.
    pub async fn close(&self) {
        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

fn anyhow_context(context: &'static str, err: sqlx::Error) -> anyhow::Error {
    anyhow::Error::new(err).context(context)
}

#[async_trait]
impl DatabasePoolInterface for DatabasePool {
    fn inner(&self) -> &AnyPool {
        &self.pool
    }

    fn flavor(&self) -> SqlFlavor {
        self.flavor
    }

    async fn health_check(&self) -> GendaoResult<()> {
        DatabasePool::health_check(self).await
    }

    async fn close(&self) {
        DatabasePool::close(self).await;
    }
}

impl std::ops::Deref for DatabasePool {
    type Target = AnyPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl std::fmt::Debug for DatabasePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabasePool")
            .field("flavor", &self.flavor)
            .field("size", &self.pool.size())
            .field("num_idle", &self.pool.num_idle())
            .finish()
    }
}

/// Creates a shared database pool.
pub async fn create_pool(config: &DatabaseConfig) -> GendaoResult<Arc<DatabasePool>> {
    let pool = DatabasePool::new(config).await?;
    Ok(Arc::new(pool))
}
