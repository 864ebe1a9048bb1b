//! # Command Emitter
//!
//! Builds and appends every follow-up command the initialization core produces.
//! Each command is keyed by the batch operation and carries
//! [`FollowUpCommandMetadata`] pointing back at it.

use tracing::debug;

use super::errors::InitializationFailure;
use crate::constants::MAX_ERROR_MESSAGE_BYTES;
use crate::models::Item;
use crate::processing::{CommandSink, SinkError};
use crate::records::{
    BatchOperationChunkIntent, BatchOperationChunkRecord, BatchOperationExecutionIntent,
    BatchOperationExecutionRecord, BatchOperationFailureRecord, BatchOperationInitializationRecord,
    BatchOperationIntent, BatchOperationLifecycleRecord, CommandRecord, FollowUpCommandMetadata,
    Intent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOperationCommandEmitter {
    partition_id: u32,
}

impl BatchOperationCommandEmitter {
    pub fn new(partition_id: u32) -> Self {
        Self { partition_id }
    }

    pub fn partition_id(&self) -> u32 {
        self.partition_id
    }

    /// Persist a resumption point; an empty cursor means "no cursor yet"
    pub fn continue_initialization(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
        cursor: &str,
        page_size: u32,
    ) -> Result<(), SinkError> {
        debug!(
            batch_operation_key = batch_operation_key,
            cursor = %cursor,
            page_size = page_size,
            "Appending continue-initialization command"
        );
        self.append(
            sink,
            batch_operation_key,
            Intent::BatchOperation(BatchOperationIntent::Initialize),
            CommandRecord::Initialization(BatchOperationInitializationRecord {
                batch_operation_key,
                search_result_cursor: cursor.to_string(),
                search_query_page_size: page_size,
            }),
        )
    }

    pub fn finish_initialization(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
    ) -> Result<(), SinkError> {
        self.append(
            sink,
            batch_operation_key,
            Intent::BatchOperation(BatchOperationIntent::FinishInitialization),
            CommandRecord::Lifecycle(BatchOperationLifecycleRecord {
                batch_operation_key,
            }),
        )
    }

    /// Hand the operation to the execution processor
    pub fn begin_execution(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
    ) -> Result<(), SinkError> {
        self.append(
            sink,
            batch_operation_key,
            Intent::Execution(BatchOperationExecutionIntent::Execute),
            CommandRecord::Execution(BatchOperationExecutionRecord {
                batch_operation_key,
            }),
        )
    }

    pub fn fail(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
        failure: &InitializationFailure,
    ) -> Result<(), SinkError> {
        self.append(
            sink,
            batch_operation_key,
            Intent::BatchOperation(BatchOperationIntent::Fail),
            CommandRecord::Failure(BatchOperationFailureRecord {
                batch_operation_key,
                error_message: bounded_error_message(&failure.message),
                error_type: failure.error_type,
                partition_id: self.partition_id,
            }),
        )
    }

    /// Chunk record for capacity checks ahead of [`Self::create_chunk`]
    pub fn chunk_record(batch_operation_key: i64, items: &[Item]) -> CommandRecord {
        CommandRecord::Chunk(BatchOperationChunkRecord {
            batch_operation_key,
            items: items.to_vec(),
        })
    }

    pub fn create_chunk(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
        chunk: CommandRecord,
    ) -> Result<(), SinkError> {
        self.append(
            sink,
            batch_operation_key,
            Intent::Chunk(BatchOperationChunkIntent::Create),
            chunk,
        )
    }

    fn append(
        &self,
        sink: &mut dyn CommandSink,
        batch_operation_key: i64,
        intent: Intent,
        record: CommandRecord,
    ) -> Result<(), SinkError> {
        sink.append_command_record(
            batch_operation_key,
            intent,
            record,
            FollowUpCommandMetadata::for_batch_operation(batch_operation_key),
        )
    }
}

/// Cut `message` at a char boundary so its JSON-escaped form stays within
/// [`MAX_ERROR_MESSAGE_BYTES`]
fn bounded_error_message(message: &str) -> String {
    let mut used = 0;
    let mut end = message.len();
    for (index, ch) in message.char_indices() {
        let width = match ch {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        };
        if used + width > MAX_ERROR_MESSAGE_BYTES {
            end = index;
            break;
        }
        used += width;
    }
    message[..end].to_string()
}
