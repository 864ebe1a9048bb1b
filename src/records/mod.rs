//! # Command Records
//!
//! Payloads of the follow-up commands emitted during initialization, together with
//! their intents and metadata. The host carries these on its own command log; the
//! serde derives exist so adapters can encode and size them.
//!
//! Lifecycle commands (continue/finish initialization, fail) share one value type.
//! Execution and chunk creation live on their own value types because separate
//! downstream processors consume them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Item;

/// Namespace a command is routed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    BatchOperationInitialization,
    BatchOperationLifecycle,
    BatchOperationChunk,
    BatchOperationExecution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationIntent {
    /// Start or continue initialization from a cursor
    Initialize,
    FinishInitialization,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationChunkIntent {
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationExecutionIntent {
    Execute,
}

/// Any intent this core can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "intent", rename_all = "snake_case")]
pub enum Intent {
    BatchOperation(BatchOperationIntent),
    Chunk(BatchOperationChunkIntent),
    Execution(BatchOperationExecutionIntent),
}

impl Intent {
    pub fn value_type(self) -> ValueType {
        match self {
            Intent::BatchOperation(BatchOperationIntent::Initialize) => {
                ValueType::BatchOperationInitialization
            }
            Intent::BatchOperation(_) => ValueType::BatchOperationLifecycle,
            Intent::Chunk(_) => ValueType::BatchOperationChunk,
            Intent::Execution(_) => ValueType::BatchOperationExecution,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::BatchOperation(BatchOperationIntent::Initialize) => {
                write!(f, "batch_operation.initialize")
            }
            Intent::BatchOperation(BatchOperationIntent::FinishInitialization) => {
                write!(f, "batch_operation.finish_initialization")
            }
            Intent::BatchOperation(BatchOperationIntent::Fail) => {
                write!(f, "batch_operation.fail")
            }
            Intent::Chunk(BatchOperationChunkIntent::Create) => {
                write!(f, "batch_operation_chunk.create")
            }
            Intent::Execution(BatchOperationExecutionIntent::Execute) => {
                write!(f, "batch_operation_execution.execute")
            }
        }
    }
}

/// Classification carried by a permanent-failure command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchOperationErrorType {
    /// The item source rejected or failed the query
    QueryFailed,
    /// Anything not attributable to the query backend
    Unknown,
}

impl fmt::Display for BatchOperationErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOperationErrorType::QueryFailed => write!(f, "QUERY_FAILED"),
            BatchOperationErrorType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// continue-initialization payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationInitializationRecord {
    pub batch_operation_key: i64,
    /// Empty string encodes "no cursor yet"
    pub search_result_cursor: String,
    pub search_query_page_size: u32,
}

/// finish-initialization payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationLifecycleRecord {
    pub batch_operation_key: i64,
}

/// begin-execution payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationExecutionRecord {
    pub batch_operation_key: i64,
}

/// permanent-failure payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationFailureRecord {
    pub batch_operation_key: i64,
    pub error_message: String,
    pub error_type: BatchOperationErrorType,
    pub partition_id: u32,
}

/// chunk-creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperationChunkRecord {
    pub batch_operation_key: i64,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum CommandRecord {
    Initialization(BatchOperationInitializationRecord),
    Lifecycle(BatchOperationLifecycleRecord),
    Execution(BatchOperationExecutionRecord),
    Failure(BatchOperationFailureRecord),
    Chunk(BatchOperationChunkRecord),
}

impl CommandRecord {
    pub fn batch_operation_key(&self) -> i64 {
        match self {
            CommandRecord::Initialization(record) => record.batch_operation_key,
            CommandRecord::Lifecycle(record) => record.batch_operation_key,
            CommandRecord::Execution(record) => record.batch_operation_key,
            CommandRecord::Failure(record) => record.batch_operation_key,
            CommandRecord::Chunk(record) => record.batch_operation_key,
        }
    }
}

/// Metadata attached to every follow-up command emitted for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpCommandMetadata {
    pub batch_operation_reference: i64,
}

impl FollowUpCommandMetadata {
    pub fn for_batch_operation(batch_operation_key: i64) -> Self {
        Self {
            batch_operation_reference: batch_operation_key,
        }
    }
}
