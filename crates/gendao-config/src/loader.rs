//! Configuration loader with layered sources.

use crate::{ConfigValidator, GendaoConfig};
use config::{Config, ConfigError, Environment, File, FileFormat};
use gendao_core::{GendaoError, GendaoResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Environment variable selecting the environment-specific file.
pub const ENVIRONMENT_VAR: &str = "GENDAO_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<GendaoConfig>>,
    config_dir: PathBuf,
    environment: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `{dir}/default.toml` - Default values
    /// 2. `{dir}/{environment}.toml` - Environment-specific overrides
    /// 3. `{dir}/local.toml` - Local overrides
    /// 4. Environment variables with the `GENDAO__` prefix
    ///
    /// The environment comes from `GENDAO_ENVIRONMENT` (default `development`).
    pub fn new(config_dir: impl Into<PathBuf>) -> GendaoResult<Self> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }
        let environment = std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::with_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn with_environment(config_dir: impl Into<PathBuf>, environment: impl Into<String>) -> GendaoResult<Self> {
        let config_dir = config_dir.into();
        let environment = environment.into();
        let config = Self::load_config(&config_dir, &environment)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> GendaoResult<Self> {
        Self::new("./config")
    }

    /// Parses and validates an inline TOML document.
    ///
    /// Only the document itself is consulted; files and environment
    /// variables are ignored.
    pub fn load_from_str(toml: &str) -> GendaoResult<GendaoConfig> {
        let config: GendaoConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error_to_gendao_error)?;
        validate(&config)?;
        Ok(config)
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> GendaoConfig {
        self.config.read().await.clone()
    }

    /// Returns the environment this loader reads.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Reloads the configuration from disk.
    ///
    /// The current configuration is kept if the new one fails to load.
    pub async fn reload(&self) -> GendaoResult<()> {
        let new_config = Self::load_config(&self.config_dir, &self.environment)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Gets a specific configuration value by dotted key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }

    fn load_config(config_dir: &Path, environment: &str) -> GendaoResult<GendaoConfig> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();
        for name in ["default", environment, "local"] {
            let path = config_dir.join(format!("{}.toml", name));
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("GENDAO")
                .separator("__")
                .try_parsing(true),
        );

        let config: GendaoConfig = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error_to_gendao_error)?;

        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &GendaoConfig) -> GendaoResult<()> {
    ConfigValidator::validate(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        GendaoError::configuration(messages.join("; "))
    })
}

fn config_error_to_gendao_error(err: ConfigError) -> GendaoError {
    GendaoError::configuration(err.to_string())
}
