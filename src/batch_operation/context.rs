use crate::models::BatchOperation;

/// Progress of one operation within a single tick
///
/// Never mutated in place: every transition returns a new context, so the value held
/// before a page is always the last committed boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationContext {
    batch_operation_key: i64,
    cursor: String,
    page_size: u32,
    items_processed: u64,
    chunk_committed: bool,
}

impl InitializationContext {
    pub fn from_operation(operation: &BatchOperation, default_page_size: u32) -> Self {
        Self {
            batch_operation_key: operation.key,
            cursor: operation.cursor().to_string(),
            page_size: operation.effective_page_size(default_page_size),
            items_processed: 0,
            chunk_committed: false,
        }
    }

    pub fn batch_operation_key(&self) -> i64 {
        self.batch_operation_key
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Items processed during this tick only
    pub fn items_processed(&self) -> u64 {
        self.items_processed
    }

    /// Whether any page of this tick produced committed chunks
    pub fn chunk_committed(&self) -> bool {
        self.chunk_committed
    }

    /// Move past a processed page
    pub fn with_next_page(&self, cursor: impl Into<String>, items_added: u64, chunked: bool) -> Self {
        Self {
            cursor: cursor.into(),
            items_processed: self.items_processed + items_added,
            chunk_committed: self.chunk_committed || chunked,
            ..self.clone()
        }
    }

    /// Same position, half the fetch pressure (never below one item)
    pub fn with_halved_page_size(&self) -> Self {
        Self {
            page_size: (self.page_size / 2).max(1),
            ..self.clone()
        }
    }
}
