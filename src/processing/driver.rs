//! # Partition Driver
//!
//! Reference host for the initialization scheduler. Owns the scheduler, the delayed
//! task queue and the in-memory state, and plays the partition's role for each due
//! callback:
//!
//! 1. Pop the next due task from the logical clock
//! 2. Run it against a fresh [`CommandBuffer`] sized by `max_command_batch_bytes`
//! 3. Apply the buffered commands to state, in order, and append them to the log
//!
//! [`PartitionDriver::step`] is fully deterministic and is what the tests drive.
//! [`PartitionDriver::run`] maps logical delays onto tokio sleeps until shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use super::schedule::{DelayedTaskQueue, ScheduledTask};
use super::sink::{AppendedCommand, CommandBuffer};
use crate::batch_operation::{BatchOperationInitializationScheduler, RetryResult};
use crate::config::BatchOperationConfig;
use crate::item_source::ItemSourceFactory;
use crate::state::InMemoryBatchOperationState;

/// What one executed callback did
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Logical time the task ran at
    pub at: Duration,
    pub task: ScheduledTask,
    /// Result of the delegated initialization attempt, if the task delegated one
    pub result: Option<RetryResult>,
    pub commands: Vec<AppendedCommand>,
}

#[derive(Debug)]
pub struct PartitionDriver {
    scheduler: BatchOperationInitializationScheduler,
    state: Arc<InMemoryBatchOperationState>,
    queue: DelayedTaskQueue,
    max_command_batch_bytes: usize,
    log: Vec<AppendedCommand>,
}

impl PartitionDriver {
    pub fn new(
        config: &BatchOperationConfig,
        state: Arc<InMemoryBatchOperationState>,
        item_sources: Arc<dyn ItemSourceFactory>,
    ) -> Self {
        let scheduler =
            BatchOperationInitializationScheduler::from_config(config, state.clone(), item_sources);
        Self::with_scheduler(scheduler, state, config.max_command_batch_bytes)
    }

    pub fn with_scheduler(
        scheduler: BatchOperationInitializationScheduler,
        state: Arc<InMemoryBatchOperationState>,
        max_command_batch_bytes: usize,
    ) -> Self {
        Self {
            scheduler,
            state,
            queue: DelayedTaskQueue::new(),
            max_command_batch_bytes,
            log: Vec::new(),
        }
    }

    /// Recovery finished: start ticking
    pub fn start(&mut self) {
        self.scheduler.on_recovered(&mut self.queue);
    }

    pub fn pause(&mut self) {
        self.scheduler.on_paused(&mut self.queue);
    }

    pub fn resume(&mut self) {
        self.scheduler.on_resumed(&mut self.queue);
    }

    pub fn state(&self) -> &Arc<InMemoryBatchOperationState> {
        &self.state
    }

    pub fn scheduler(&self) -> &BatchOperationInitializationScheduler {
        &self.scheduler
    }

    pub fn queue(&self) -> &DelayedTaskQueue {
        &self.queue
    }

    /// Every command applied so far, in log order
    pub fn log(&self) -> &[AppendedCommand] {
        &self.log
    }

    /// Run the next due task; `None` when nothing is scheduled
    pub fn step(&mut self) -> Option<StepReport> {
        let (at, task) = self.queue.pop_next()?;
        let mut buffer = CommandBuffer::new(self.max_command_batch_bytes);

        let result = self.scheduler.execute(task, &mut buffer, &mut self.queue);

        let commands = buffer.drain();
        for command in &commands {
            self.state.apply(command);
        }
        self.log.extend(commands.iter().cloned());

        debug!(
            at_ms = at.as_millis() as u64,
            task = ?task,
            commands = commands.len(),
            "Executed scheduled task"
        );
        Some(StepReport {
            at,
            task,
            result,
            commands,
        })
    }

    /// Run every task due at or before logical time `until`
    pub fn run_until(&mut self, until: Duration) -> Vec<StepReport> {
        let mut reports = Vec::new();
        while self.queue.next_due().is_some_and(|due| due <= until) {
            match self.step() {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }

    /// Drive the queue in real time until `shutdown` flips to `true` or its sender is
    /// dropped; returns the driver for inspection
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        info!(
            pending_tasks = self.queue.len(),
            "Starting batch operation partition driver"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let Some(due) = self.queue.next_due() else {
                // Nothing will ever be scheduled again without a step
                let _ = shutdown.changed().await;
                break;
            };
            let wait = due.saturating_sub(self.queue.now());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.step();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(
            applied_commands = self.log.len(),
            "Batch operation partition driver stopped"
        );
        self
    }
}
