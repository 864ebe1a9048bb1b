//! # Retry Handler
//!
//! Decides whether a failed initialization attempt is retried later or is terminal.
//!
//! ## Classification
//!
//! - Search rejections the backend will answer the same way forever (not found,
//!   not unique, secondary storage not configured, forbidden) fail immediately.
//! - Everything else is retried with exponential backoff until the retry budget is
//!   spent.
//!
//! ## Backoff
//!
//! `delay(attempt) = min(max_delay, initial_delay * factor^attempt)`, computed in
//! milliseconds. Overflowing or non-finite intermediate values clamp to the cap.

use std::time::Duration;
use tracing::{debug, warn};

use super::errors::InitializationFailure;
use super::initializer::InitializationOutcome;
use crate::config::BatchOperationConfig;

/// Three-way result of one guarded initialization attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RetryResult {
    Success {
        outcome: InitializationOutcome,
    },
    /// Try again after `delay`; `attempt` is the count to pass to the next run
    Retry {
        delay: Duration,
        attempt: u32,
        failure: InitializationFailure,
    },
    /// Terminal: the operation must be failed
    Failure { failure: InitializationFailure },
}

impl RetryResult {
    /// Cursor to remember for this result: the outcome's cursor on success, the
    /// resumable cursor otherwise
    pub fn cursor(&self) -> &str {
        match self {
            RetryResult::Success { outcome } => outcome.cursor(),
            RetryResult::Retry { failure, .. } | RetryResult::Failure { failure } => {
                &failure.resumable_cursor
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperationRetryHandler {
    initial_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
    backoff_factor: f64,
}

impl BatchOperationRetryHandler {
    pub fn new(
        initial_delay: Duration,
        max_delay: Duration,
        max_retries: u32,
        backoff_factor: f64,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_retries,
            backoff_factor,
        }
    }

    pub fn from_config(config: &BatchOperationConfig) -> Self {
        Self::new(
            config.query_retry_initial_delay(),
            config.query_retry_max_delay(),
            config.query_retry_max,
            config.query_retry_backoff_factor,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `attempt_fn` once and classify its result
    pub fn execute_with_retry<F>(&self, attempt_fn: F, attempts_so_far: u32) -> RetryResult
    where
        F: FnOnce() -> Result<InitializationOutcome, InitializationFailure>,
    {
        let failure = match attempt_fn() {
            Ok(outcome) => return RetryResult::Success { outcome },
            Err(failure) => failure,
        };

        if let Some(reason) = failure.search_reason() {
            if !reason.is_retryable() {
                warn!(
                    reason = %reason,
                    error = %failure.message,
                    "Search rejected with a non-retryable reason, failing without retry"
                );
                return RetryResult::Failure { failure };
            }
        }

        if attempts_so_far >= self.max_retries {
            warn!(
                attempts = attempts_so_far,
                max_retries = self.max_retries,
                error = %failure.message,
                "Initialization retries exhausted"
            );
            return RetryResult::Failure { failure };
        }

        let delay = self.backoff_delay(attempts_so_far);
        debug!(
            attempt = attempts_so_far + 1,
            delay_ms = delay.as_millis() as u64,
            resumable_cursor = %failure.resumable_cursor,
            "Scheduling initialization retry"
        );
        RetryResult::Retry {
            delay,
            attempt: attempts_so_far + 1,
            failure,
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let max_ms = self.max_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);

        if !delay_ms.is_finite() || delay_ms >= max_ms {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms.max(0.0) as u64)
        }
    }
}

impl Default for BatchOperationRetryHandler {
    fn default() -> Self {
        Self::from_config(&BatchOperationConfig::default())
    }
}
