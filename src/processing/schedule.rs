//! Delayed-callback facility of the partition and its deterministic reference
//! implementation.
//!
//! The host invokes due tasks strictly in (due time, submission order) on the
//! partition's single logical thread, including during replay.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

/// Callbacks the initialization scheduler asks the host to run later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledTask {
    /// Regular fixed-interval tick
    InitializationTick,
    /// One-off retry of a failed initialization attempt
    InitializationRetry {
        batch_operation_key: i64,
        attempt: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledTaskHandle(u64);

impl ScheduledTaskHandle {
    /// Wrap a host-issued task id
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

pub trait ScheduleService {
    fn run_delayed(&mut self, delay: Duration, task: ScheduledTask) -> ScheduledTaskHandle;

    /// Drop a task that has not run yet; `false` if it already ran or was unknown
    fn cancel(&mut self, handle: ScheduledTaskHandle) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingTask {
    due: Duration,
    sequence: u64,
    task: ScheduledTask,
}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.sequence).cmp(&(other.due, other.sequence))
    }
}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// [`ScheduleService`] on a logical clock
///
/// Time only moves when a task is popped, so a sequence of pops is fully determined
/// by the sequence of submissions.
#[derive(Debug, Default)]
pub struct DelayedTaskQueue {
    now: Duration,
    next_sequence: u64,
    pending: BinaryHeap<Reverse<PendingTask>>,
}

impl DelayedTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical time of the last popped task
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.peek().map(|Reverse(task)| task.due)
    }

    /// Pop the earliest task and advance the clock to its due time
    pub fn pop_next(&mut self) -> Option<(Duration, ScheduledTask)> {
        let Reverse(next) = self.pending.pop()?;
        self.now = self.now.max(next.due);
        Some((next.due, next.task))
    }

    /// Pending tasks in the order they will run
    pub fn pending_tasks(&self) -> Vec<(Duration, ScheduledTask)> {
        let mut tasks: Vec<&PendingTask> = self.pending.iter().map(|Reverse(t)| t).collect();
        tasks.sort();
        tasks.into_iter().map(|t| (t.due, t.task)).collect()
    }
}

impl ScheduleService for DelayedTaskQueue {
    fn run_delayed(&mut self, delay: Duration, task: ScheduledTask) -> ScheduledTaskHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.push(Reverse(PendingTask {
            due: self.now.saturating_add(delay),
            sequence,
            task,
        }));
        ScheduledTaskHandle(sequence)
    }

    fn cancel(&mut self, handle: ScheduledTaskHandle) -> bool {
        let before = self.pending.len();
        self.pending
            .retain(|Reverse(pending)| pending.sequence != handle.0);
        self.pending.len() != before
    }
}
