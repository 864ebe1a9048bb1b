//! Configuration Loader
//!
//! Environment-aware loading: built-in defaults, then `base.toml`, then
//! `<environment>.toml`, then `BATCHOPS__*` environment variables. Both files are
//! optional; the merged result is validated before it is handed out.

use config::{Config, Environment, File, Map};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::BatchOperationConfig;

const ENV_PREFIX: &str = "BATCHOPS";
const DEFAULT_CONFIG_DIRECTORY: &str = "config/batchops";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BatchOperationConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Same as [`Self::load_from_directory_with_env`] but reads variable overrides from
    /// `overrides` instead of the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory =
            config_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIRECTORY));

        debug!(
            environment = %environment,
            config_directory = %config_directory.display(),
            "Loading batch operation configuration"
        );

        let config = Self::build_config(&config_directory, environment, overrides)?;
        config.validate()?;

        info!(
            environment = %environment,
            scheduler_interval_ms = config.scheduler_interval_ms,
            chunk_size = config.chunk_size,
            query_page_size = config.query_page_size,
            query_retry_max = config.query_retry_max,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: BatchOperationConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            config_directory: PathBuf::from(DEFAULT_CONFIG_DIRECTORY),
        }))
    }

    pub fn config(&self) -> &BatchOperationConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the deployment environment from environment variables
    pub fn detect_environment() -> String {
        crate::logging::get_environment()
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<Map<String, String>>,
    ) -> ConfigResult<BatchOperationConfig> {
        if !config_directory.exists() {
            debug!(
                config_directory = %config_directory.display(),
                "Configuration directory missing, using defaults and environment only"
            );
        }

        let defaults = Config::try_from(&BatchOperationConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let base_path = config_directory.join("base.toml");
        let environment_path = config_directory.join(format!("{environment}.toml"));

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(base_path).required(false))
            .add_source(File::from(environment_path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .try_parsing(true)
                    .source(overrides),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(config_directory.display().to_string(), e))?;

        settings
            .try_deserialize::<BatchOperationConfig>()
            .map_err(ConfigurationError::deserialization_error)
    }
}
