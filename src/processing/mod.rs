//! # Partition Processing Surface
//!
//! What the initialization core needs from the partition hosting it: a per-tick
//! [`CommandSink`], a [`ScheduleService`] for delayed callbacks, and the reference
//! [`PartitionDriver`] that wires both to in-memory state.

pub mod driver;
pub mod schedule;
pub mod sink;

pub use driver::{PartitionDriver, StepReport};
pub use schedule::{DelayedTaskQueue, ScheduleService, ScheduledTask, ScheduledTaskHandle};
pub use sink::{AppendedCommand, CommandBuffer, CommandSink, SinkError, LIFECYCLE_RESERVE_BYTES};
