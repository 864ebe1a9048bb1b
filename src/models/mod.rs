//! Domain values read by the initialization core.

pub mod batch_operation;
pub mod item;

pub use batch_operation::{BatchOperation, BatchOperationStatus, BatchOperationType};
pub use item::{Item, ItemPage};
