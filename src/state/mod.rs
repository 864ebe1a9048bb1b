//! Read access to persisted batch operations.
//!
//! The initialization core only reads state; the records it emits are applied by
//! downstream processors. [`InMemoryBatchOperationState`] plays both roles for tests
//! and the reference partition driver.

pub mod in_memory;

use crate::models::BatchOperation;

pub use in_memory::InMemoryBatchOperationState;

pub trait BatchOperationState: Send + Sync {
    /// Next operation still waiting for initialization, if any
    fn next_pending_batch_operation(&self) -> Option<BatchOperation>;

    fn batch_operation(&self, key: i64) -> Option<BatchOperation>;
}
