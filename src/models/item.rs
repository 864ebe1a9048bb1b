use serde::{Deserialize, Serialize};

/// One target of a batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub item_key: i64,
    /// Key of the owning scope, e.g. the root process instance
    pub scope_key: i64,
}

impl Item {
    pub fn new(item_key: i64, scope_key: i64) -> Self {
        Self {
            item_key,
            scope_key,
        }
    }
}

/// One page of items returned by an item source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Opaque resumption token; `None` when the source has nothing further to offer
    pub next_cursor: Option<String>,
    /// Estimated size of the full result set
    pub total_count: u64,
    pub is_last_page: bool,
}

impl ItemPage {
    pub fn new(
        items: Vec<Item>,
        next_cursor: Option<String>,
        total_count: u64,
        is_last_page: bool,
    ) -> Self {
        Self {
            items,
            next_cursor,
            total_count,
            is_last_page,
        }
    }

    /// A page with no items that ends the result set
    pub fn empty_last(next_cursor: Option<String>) -> Self {
        Self::new(Vec::new(), next_cursor, 0, true)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
