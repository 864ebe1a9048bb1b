//! # Batch Operation Initialization Scheduler
//!
//! Entry point of batch operation initialization on a partition. Runs on a fixed
//! interval through the host's [`ScheduleService`], picks the next pending operation
//! and delegates one guarded initialization attempt to the retry handler.
//!
//! ## Tick
//!
//! 1. Ask state for the next pending operation; none means just reschedule.
//! 2. Skip operations with a pending one-off retry and operations whose
//!    `(key, cursor, page size)` was already delegated by this instance.
//! 3. Delegate, then act on the [`RetryResult`]:
//!    - `Success`: remember the input and reschedule.
//!    - `Retry`: persist the resumable cursor, schedule a one-off retry, reschedule.
//!    - `Failure`: emit a permanent failure, reschedule.
//!
//! The input is only remembered once the command closing the run was appended; a
//! refused continue or failure command leaves the next tick free to delegate again.
//!
//! The memo lives only in memory; a restarted partition delegates every pending
//! operation once more, which the downstream processors tolerate because cursors are
//! replayed from the log.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::command_emitter::BatchOperationCommandEmitter;
use super::errors::InitializationFailure;
use super::initializer::{BatchOperationInitializer, InitializationOutcome};
use super::page_processor::BatchOperationPageProcessor;
use super::retry_handler::{BatchOperationRetryHandler, RetryResult};
use crate::config::BatchOperationConfig;
use crate::constants::log_operations;
use crate::item_source::ItemSourceFactory;
use crate::logging::{log_batch_operation, log_error};
use crate::models::BatchOperation;
use crate::processing::{CommandSink, ScheduleService, ScheduledTask, ScheduledTaskHandle};
use crate::state::BatchOperationState;

/// Input of the last delegated run
#[derive(Debug, Clone, PartialEq, Eq)]
struct DelegatedInput {
    batch_operation_key: i64,
    cursor: String,
    page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRetry {
    batch_operation_key: i64,
    attempt: u32,
    handle: Option<ScheduledTaskHandle>,
}

pub struct BatchOperationInitializationScheduler {
    state: Arc<dyn BatchOperationState>,
    initializer: BatchOperationInitializer,
    retry_handler: BatchOperationRetryHandler,
    emitter: BatchOperationCommandEmitter,
    interval: Duration,
    last_delegated: Option<DelegatedInput>,
    pending_retry: Option<PendingRetry>,
    next_tick: Option<ScheduledTaskHandle>,
    paused: bool,
}

impl std::fmt::Debug for BatchOperationInitializationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOperationInitializationScheduler")
            .field("initializer", &self.initializer)
            .field("retry_handler", &self.retry_handler)
            .field("interval", &self.interval)
            .field("last_delegated", &self.last_delegated)
            .field("pending_retry", &self.pending_retry)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl BatchOperationInitializationScheduler {
    pub fn new(
        state: Arc<dyn BatchOperationState>,
        initializer: BatchOperationInitializer,
        retry_handler: BatchOperationRetryHandler,
        emitter: BatchOperationCommandEmitter,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            initializer,
            retry_handler,
            emitter,
            interval,
            last_delegated: None,
            pending_retry: None,
            next_tick: None,
            paused: false,
        }
    }

    /// Wire the whole initialization core from configuration
    pub fn from_config(
        config: &BatchOperationConfig,
        state: Arc<dyn BatchOperationState>,
        item_sources: Arc<dyn ItemSourceFactory>,
    ) -> Self {
        let emitter = BatchOperationCommandEmitter::new(config.partition_id);
        let initializer = BatchOperationInitializer::new(
            item_sources,
            BatchOperationPageProcessor::new(config.chunk_size, emitter),
            emitter,
            config.query_page_size,
        );
        Self::new(
            state,
            initializer,
            BatchOperationRetryHandler::from_config(config),
            emitter,
            config.scheduler_interval(),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Key and attempt of the one-off retry currently waiting, if any
    pub fn pending_retry(&self) -> Option<(i64, u32)> {
        self.pending_retry
            .map(|retry| (retry.batch_operation_key, retry.attempt))
    }

    /// Partition became leader and finished replay
    pub fn on_recovered(&mut self, schedule: &mut dyn ScheduleService) {
        info!(interval_ms = self.interval.as_millis() as u64, "Batch operation initialization scheduler started");
        self.paused = false;
        self.schedule_tick(schedule);
    }

    pub fn on_paused(&mut self, schedule: &mut dyn ScheduleService) {
        info!("Batch operation initialization scheduler paused");
        self.paused = true;
        if let Some(handle) = self.next_tick.take() {
            schedule.cancel(handle);
        }
        if let Some(retry) = self.pending_retry.as_mut() {
            if let Some(handle) = retry.handle.take() {
                schedule.cancel(handle);
            }
        }
    }

    /// Restart ticking and re-arm a retry that was cancelled by the pause
    pub fn on_resumed(&mut self, schedule: &mut dyn ScheduleService) {
        info!("Batch operation initialization scheduler resumed");
        self.paused = false;
        if let Some(retry) = self.pending_retry.as_mut() {
            if retry.handle.is_none() {
                let delay = self
                    .retry_handler
                    .backoff_delay(retry.attempt.saturating_sub(1));
                retry.handle = Some(schedule.run_delayed(
                    delay,
                    ScheduledTask::InitializationRetry {
                        batch_operation_key: retry.batch_operation_key,
                        attempt: retry.attempt,
                    },
                ));
            }
        }
        if self.next_tick.is_none() {
            self.schedule_tick(schedule);
        }
    }

    /// Run one scheduled callback; returns the delegated result, if there was one
    #[instrument(skip(self, sink, schedule))]
    pub fn execute(
        &mut self,
        task: ScheduledTask,
        sink: &mut dyn CommandSink,
        schedule: &mut dyn ScheduleService,
    ) -> Option<RetryResult> {
        match task {
            ScheduledTask::InitializationTick => self.on_tick(sink, schedule),
            ScheduledTask::InitializationRetry {
                batch_operation_key,
                attempt,
            } => self.on_retry(batch_operation_key, attempt, sink, schedule),
        }
    }

    fn on_tick(
        &mut self,
        sink: &mut dyn CommandSink,
        schedule: &mut dyn ScheduleService,
    ) -> Option<RetryResult> {
        self.next_tick = None;
        if self.paused {
            debug!("Scheduler paused, ignoring initialization tick");
            return None;
        }

        let result = match self.state.next_pending_batch_operation() {
            Some(operation) if self.has_pending_retry(operation.key) => {
                debug!(
                    batch_operation_key = operation.key,
                    "Retry pending for batch operation, skipping tick"
                );
                None
            }
            Some(operation) if self.already_delegated(&operation) => {
                debug!(
                    batch_operation_key = operation.key,
                    cursor = %operation.cursor(),
                    "Batch operation unchanged since last run, skipping tick"
                );
                None
            }
            Some(operation) => {
                log_batch_operation(
                    log_operations::TICK,
                    operation.key,
                    Some(operation.cursor()),
                    "delegating",
                    None,
                );
                Some(self.delegate(&operation, 0, sink, schedule))
            }
            None => None,
        };

        self.schedule_tick(schedule);
        result
    }

    fn on_retry(
        &mut self,
        batch_operation_key: i64,
        attempt: u32,
        sink: &mut dyn CommandSink,
        schedule: &mut dyn ScheduleService,
    ) -> Option<RetryResult> {
        if self.paused {
            debug!(batch_operation_key, "Scheduler paused, ignoring initialization retry");
            return None;
        }
        if self
            .pending_retry
            .is_some_and(|retry| retry.batch_operation_key == batch_operation_key)
        {
            self.pending_retry = None;
        }

        let operation = match self.state.batch_operation(batch_operation_key) {
            Some(operation) if operation.status.is_pending_initialization() => operation,
            _ => {
                debug!(
                    batch_operation_key,
                    attempt, "Batch operation no longer pending, dropping retry"
                );
                return None;
            }
        };

        log_batch_operation(
            log_operations::RETRY,
            batch_operation_key,
            Some(operation.cursor()),
            "delegating",
            Some(&format!("attempt {attempt}")),
        );
        Some(self.delegate(&operation, attempt, sink, schedule))
    }

    fn delegate(
        &mut self,
        operation: &BatchOperation,
        attempts_so_far: u32,
        sink: &mut dyn CommandSink,
        schedule: &mut dyn ScheduleService,
    ) -> RetryResult {
        let input = DelegatedInput {
            batch_operation_key: operation.key,
            cursor: operation.cursor().to_string(),
            page_size: operation.effective_page_size(self.initializer.default_page_size()),
        };

        let initializer = &self.initializer;
        let result = self.retry_handler.execute_with_retry(
            || initializer.initialize(operation, &mut *sink),
            attempts_so_far,
        );

        match &result {
            RetryResult::Success { outcome } => {
                self.on_success(operation, outcome, input);
            }
            RetryResult::Retry {
                delay,
                attempt,
                failure,
            } => {
                self.on_retryable_failure(operation, *delay, *attempt, failure, input, sink, schedule);
            }
            RetryResult::Failure { failure } => {
                self.on_terminal_failure(operation, failure, input, sink);
            }
        }

        result
    }

    fn on_success(
        &mut self,
        operation: &BatchOperation,
        outcome: &InitializationOutcome,
        input: DelegatedInput,
    ) {
        match outcome {
            // A paused operation must run again once resumed at the same cursor
            InitializationOutcome::Suspended { .. } => {}
            InitializationOutcome::Finished { items_processed } => {
                log_batch_operation(
                    log_operations::FINISH,
                    operation.key,
                    Some(outcome.cursor()),
                    "finished",
                    Some(&format!("{items_processed} items")),
                );
                self.last_delegated = Some(input);
            }
            InitializationOutcome::Continue { cursor, page_size } => {
                log_batch_operation(
                    log_operations::CONTINUE,
                    operation.key,
                    Some(cursor),
                    "continuing",
                    Some(&format!("page size {page_size}")),
                );
                self.last_delegated = Some(input);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_retryable_failure(
        &mut self,
        operation: &BatchOperation,
        delay: Duration,
        attempt: u32,
        failure: &InitializationFailure,
        input: DelegatedInput,
        sink: &mut dyn CommandSink,
        schedule: &mut dyn ScheduleService,
    ) {
        // Without a persisted cursor the retry would re-emit this tick's chunks
        if let Err(e) = self.emitter.continue_initialization(
            sink,
            operation.key,
            &failure.resumable_cursor,
            input.page_size,
        ) {
            log_error(
                "BatchOperationInitializationScheduler",
                log_operations::CONTINUE,
                &e.to_string(),
                Some(&format!("batch_operation_key={}", operation.key)),
            );
            self.last_delegated = None;
            return;
        }

        let handle = schedule.run_delayed(
            delay,
            ScheduledTask::InitializationRetry {
                batch_operation_key: operation.key,
                attempt,
            },
        );
        self.pending_retry = Some(PendingRetry {
            batch_operation_key: operation.key,
            attempt,
            handle: Some(handle),
        });
        self.last_delegated = Some(input);

        log_batch_operation(
            log_operations::RETRY,
            operation.key,
            Some(&failure.resumable_cursor),
            "retry_scheduled",
            Some(&format!(
                "attempt {attempt} in {}ms: {}",
                delay.as_millis(),
                failure.message
            )),
        );
    }

    fn on_terminal_failure(
        &mut self,
        operation: &BatchOperation,
        failure: &InitializationFailure,
        input: DelegatedInput,
        sink: &mut dyn CommandSink,
    ) {
        log_error(
            "BatchOperationInitializationScheduler",
            log_operations::INITIALIZE,
            &failure.to_string(),
            Some(&format!("batch_operation_key={}", operation.key)),
        );

        // An unappended failure leaves the memo clear so the next tick tries again
        if let Err(e) = self.emitter.fail(sink, operation.key, failure) {
            log_error(
                "BatchOperationInitializationScheduler",
                log_operations::FAIL,
                &e.to_string(),
                Some(&format!("batch_operation_key={}", operation.key)),
            );
            self.last_delegated = None;
            return;
        }

        log_batch_operation(
            log_operations::FAIL,
            operation.key,
            Some(&failure.resumable_cursor),
            "failed",
            Some(&failure.message),
        );
        self.last_delegated = Some(input);
    }

    fn has_pending_retry(&self, batch_operation_key: i64) -> bool {
        self.pending_retry
            .is_some_and(|retry| retry.batch_operation_key == batch_operation_key)
    }

    fn already_delegated(&self, operation: &BatchOperation) -> bool {
        self.last_delegated.as_ref().is_some_and(|last| {
            last.batch_operation_key == operation.key
                && last.cursor == operation.cursor()
                && last.page_size
                    == operation.effective_page_size(self.initializer.default_page_size())
        })
    }

    fn schedule_tick(&mut self, schedule: &mut dyn ScheduleService) {
        self.next_tick = Some(schedule.run_delayed(self.interval, ScheduledTask::InitializationTick));
    }
}
