//! # Batch Operation Configuration
//!
//! Configuration for the initialization scheduler, page processing, and query retry
//! behavior. Values are loaded by [`ConfigManager`] from layered TOML files and
//! `BATCHOPS__*` environment variables, then validated explicitly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batchops_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let interval = manager.config().scheduler_interval();
//! let chunk_size = manager.config().chunk_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Configuration for batch operation initialization on one partition
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchOperationConfig {
    /// Fixed interval between scheduler ticks
    pub scheduler_interval_ms: u64,
    /// Maximum number of items packed into one chunk-creation command
    pub chunk_size: usize,
    /// Page size used when the persisted operation carries none
    pub query_page_size: u32,
    /// Maximum number of retries for retryable query failures
    pub query_retry_max: u32,
    /// Delay before the first retry
    pub query_retry_initial_delay_ms: u64,
    /// Upper bound for any retry delay
    pub query_retry_max_delay_ms: u64,
    /// Exponential multiplier applied per attempt
    pub query_retry_backoff_factor: f64,
    /// Partition reported in permanent-failure commands
    pub partition_id: u32,
    /// Output budget of one tick, used by the reference command buffer
    pub max_command_batch_bytes: usize,
}

impl Default for BatchOperationConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_ms: defaults::SCHEDULER_INTERVAL_MS,
            chunk_size: defaults::CHUNK_SIZE,
            query_page_size: defaults::QUERY_PAGE_SIZE,
            query_retry_max: defaults::QUERY_RETRY_MAX,
            query_retry_initial_delay_ms: defaults::QUERY_RETRY_INITIAL_DELAY_MS,
            query_retry_max_delay_ms: defaults::QUERY_RETRY_MAX_DELAY_MS,
            query_retry_backoff_factor: defaults::QUERY_RETRY_BACKOFF_FACTOR,
            partition_id: defaults::PARTITION_ID,
            max_command_batch_bytes: defaults::MAX_COMMAND_BATCH_BYTES,
        }
    }
}

impl BatchOperationConfig {
    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler_interval_ms)
    }

    pub fn query_retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.query_retry_initial_delay_ms)
    }

    pub fn query_retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.query_retry_max_delay_ms)
    }

    /// Reject values that would stall or corrupt initialization
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scheduler_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler_interval_ms",
                "must be greater than 0",
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "chunk_size",
                "must be greater than 0",
            ));
        }
        if self.query_page_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "query_page_size",
                "must be greater than 0",
            ));
        }
        if self.query_retry_backoff_factor.is_nan() || self.query_retry_backoff_factor < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "query_retry_backoff_factor",
                format!(
                    "must be at least 1.0, got {}",
                    self.query_retry_backoff_factor
                ),
            ));
        }
        if self.query_retry_initial_delay_ms > self.query_retry_max_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "query_retry_initial_delay_ms",
                format!(
                    "must not exceed query_retry_max_delay_ms ({})",
                    self.query_retry_max_delay_ms
                ),
            ));
        }
        if self.max_command_batch_bytes == 0 {
            return Err(ConfigurationError::invalid_value(
                "max_command_batch_bytes",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}
