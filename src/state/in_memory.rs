use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

use super::BatchOperationState;
use crate::models::{BatchOperation, BatchOperationStatus};
use crate::processing::AppendedCommand;
use crate::records::{
    BatchOperationExecutionIntent, BatchOperationIntent, CommandRecord, Intent,
};

/// Batch operations keyed by operation key
///
/// Created operations are offered before suspended ones so a paused operation never
/// starves the rest of the queue.
#[derive(Debug, Default)]
pub struct InMemoryBatchOperationState {
    operations: RwLock<BTreeMap<i64, BatchOperation>>,
}

impl InMemoryBatchOperationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, operation: BatchOperation) {
        self.operations.write().insert(operation.key, operation);
    }

    pub fn remove(&self, key: i64) -> Option<BatchOperation> {
        self.operations.write().remove(&key)
    }

    pub fn suspend(&self, key: i64) -> bool {
        self.set_status(key, BatchOperationStatus::Suspended)
    }

    pub fn resume(&self, key: i64) -> bool {
        self.set_status(key, BatchOperationStatus::Created)
    }

    pub fn all(&self) -> Vec<BatchOperation> {
        self.operations.read().values().cloned().collect()
    }

    /// Apply one emitted command the way the downstream processors would
    pub fn apply(&self, command: &AppendedCommand) {
        let mut operations = self.operations.write();
        let Some(current) = operations.get(&command.key).cloned() else {
            debug!(
                batch_operation_key = command.key,
                intent = %command.intent,
                "Ignoring command for unknown batch operation"
            );
            return;
        };

        let updated = match (&command.intent, &command.record) {
            (
                Intent::BatchOperation(BatchOperationIntent::Initialize),
                CommandRecord::Initialization(record),
            ) => current
                .with_cursor(record.search_result_cursor.clone())
                .with_page_size(record.search_query_page_size),
            (Intent::Chunk(_), CommandRecord::Chunk(record)) => {
                let total = current.total_items_processed + record.items.len() as u64;
                current.with_items_processed(total)
            }
            (Intent::BatchOperation(BatchOperationIntent::FinishInitialization), _) => {
                current.with_status(BatchOperationStatus::Initialized)
            }
            (Intent::Execution(BatchOperationExecutionIntent::Execute), _) => {
                current.with_status(BatchOperationStatus::Active)
            }
            (Intent::BatchOperation(BatchOperationIntent::Fail), _) => {
                current.with_status(BatchOperationStatus::Failed)
            }
            _ => current,
        };

        operations.insert(command.key, updated);
    }

    fn set_status(&self, key: i64, status: BatchOperationStatus) -> bool {
        let mut operations = self.operations.write();
        match operations.get(&key).cloned() {
            Some(operation) => {
                operations.insert(key, operation.with_status(status));
                true
            }
            None => false,
        }
    }
}

impl BatchOperationState for InMemoryBatchOperationState {
    fn next_pending_batch_operation(&self) -> Option<BatchOperation> {
        let operations = self.operations.read();
        operations
            .values()
            .find(|operation| operation.status == BatchOperationStatus::Created)
            .or_else(|| {
                operations
                    .values()
                    .find(|operation| operation.status.is_pending_initialization())
            })
            .cloned()
    }

    fn batch_operation(&self, key: i64) -> Option<BatchOperation> {
        self.operations.read().get(&key).cloned()
    }
}
