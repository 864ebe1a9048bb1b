//! Command sink contract and the byte-budgeted reference buffer.
//!
//! One tick writes into one sink. The capacity check is advisory from the sink's side
//! and mandatory from the caller's: chunk emission must consult
//! [`CommandSink::can_append_records`] before every append.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::RECORD_FRAMING_BYTES;
use crate::records::{CommandRecord, FollowUpCommandMetadata, Intent};

/// Headroom kept out of capacity checks so lifecycle commands always fit after the
/// last chunk that was allowed in
pub const LIFECYCLE_RESERVE_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Command of {required} bytes exceeds remaining capacity of {remaining} bytes")]
    CapacityExceeded { required: usize, remaining: usize },

    #[error("Failed to encode command: {0}")]
    Encoding(String),
}

/// Per-tick output of the processing thread
pub trait CommandSink {
    /// Whether `records` would fit into what is left of this tick's output
    fn can_append_records(
        &self,
        records: &[CommandRecord],
        metadata: &FollowUpCommandMetadata,
    ) -> bool;

    fn append_command_record(
        &mut self,
        key: i64,
        intent: Intent,
        record: CommandRecord,
        metadata: FollowUpCommandMetadata,
    ) -> Result<(), SinkError>;
}

/// A command accepted by a sink, in append order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendedCommand {
    pub key: i64,
    pub intent: Intent,
    pub record: CommandRecord,
    pub metadata: FollowUpCommandMetadata,
}

/// [`CommandSink`] bounded by the encoded size of its records
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    max_bytes: usize,
    used_bytes: usize,
    commands: Vec<AppendedCommand>,
}

impl CommandBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            commands: Vec::new(),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn commands(&self) -> &[AppendedCommand] {
        &self.commands
    }

    /// Hand the buffered commands to the host, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<AppendedCommand> {
        self.used_bytes = 0;
        std::mem::take(&mut self.commands)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn remaining_bytes(&self) -> usize {
        self.max_bytes.saturating_sub(self.used_bytes)
    }

    /// Encoded size of one record including framing
    pub fn encoded_size(
        record: &CommandRecord,
        metadata: &FollowUpCommandMetadata,
    ) -> Result<usize, SinkError> {
        let record_bytes =
            serde_json::to_vec(record).map_err(|e| SinkError::Encoding(e.to_string()))?;
        let metadata_bytes =
            serde_json::to_vec(metadata).map_err(|e| SinkError::Encoding(e.to_string()))?;
        Ok(record_bytes.len() + metadata_bytes.len() + RECORD_FRAMING_BYTES)
    }
}

impl CommandSink for CommandBuffer {
    fn can_append_records(
        &self,
        records: &[CommandRecord],
        metadata: &FollowUpCommandMetadata,
    ) -> bool {
        let mut required = 0usize;
        for record in records {
            match Self::encoded_size(record, metadata) {
                Ok(size) => required = required.saturating_add(size),
                Err(_) => return false,
            }
        }
        let available = self.remaining_bytes().saturating_sub(LIFECYCLE_RESERVE_BYTES);
        required <= available
    }

    fn append_command_record(
        &mut self,
        key: i64,
        intent: Intent,
        record: CommandRecord,
        metadata: FollowUpCommandMetadata,
    ) -> Result<(), SinkError> {
        let required = Self::encoded_size(&record, &metadata)?;
        let remaining = self.remaining_bytes();
        if required > remaining {
            return Err(SinkError::CapacityExceeded {
                required,
                remaining,
            });
        }

        self.used_bytes += required;
        self.commands.push(AppendedCommand {
            key,
            intent,
            record,
            metadata,
        });
        Ok(())
    }
}
