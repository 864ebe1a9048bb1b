use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ItemSource, ItemSourceError, ItemSourceFactory};
use crate::models::{BatchOperation, BatchOperationType};

/// [`ItemSourceFactory`] keyed on the operation's declared type
#[derive(Default, Clone)]
pub struct ItemSourceRegistry {
    sources: BTreeMap<BatchOperationType, Arc<dyn ItemSource>>,
}

impl std::fmt::Debug for ItemSourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemSourceRegistry")
            .field("operation_types", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ItemSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(
        mut self,
        operation_type: BatchOperationType,
        source: Arc<dyn ItemSource>,
    ) -> Self {
        self.register(operation_type, source);
        self
    }

    /// Register `source` for `operation_type`, replacing any previous one
    pub fn register(&mut self, operation_type: BatchOperationType, source: Arc<dyn ItemSource>) {
        self.sources.insert(operation_type, source);
    }
}

impl ItemSourceFactory for ItemSourceRegistry {
    fn item_source_for(
        &self,
        operation: &BatchOperation,
    ) -> Result<Arc<dyn ItemSource>, ItemSourceError> {
        self.sources
            .get(&operation.operation_type)
            .cloned()
            .ok_or(ItemSourceError::UnsupportedOperationType(
                operation.operation_type,
            ))
    }
}
