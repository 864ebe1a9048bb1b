//! # Item Sources
//!
//! Contract for the external query backend that resolves the items a batch operation
//! targets, one bounded page at a time.
//!
//! The initializer treats a source's answer for a given `(cursor, page_size)` as
//! deterministic; replay correctness depends on that. Sources are chosen per
//! operation type through an [`ItemSourceFactory`].

pub mod in_memory;
pub mod registry;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{BatchOperation, BatchOperationType, ItemPage};

pub use in_memory::InMemoryItemSource;
pub use registry::ItemSourceRegistry;

/// One page-fetching backend for a family of batch operations
pub trait ItemSource: Send + Sync {
    /// Fetch the page starting at `cursor` (empty = start of data)
    fn fetch_page(&self, cursor: &str, page_size: u32) -> Result<ItemPage, ItemSourceError>;
}

/// Selects the item source for an operation based on its declared type
pub trait ItemSourceFactory: Send + Sync {
    fn item_source_for(
        &self,
        operation: &BatchOperation,
    ) -> Result<Arc<dyn ItemSource>, ItemSourceError>;
}

/// Reason reported by the query backend for a failed search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchErrorReason {
    NotFound,
    NotUnique,
    SecondaryStorageNotSet,
    Forbidden,
    InvalidArgument,
    Internal,
    Unavailable,
}

impl SearchErrorReason {
    /// Reasons that can never succeed by asking again
    pub const NON_RETRYABLE: [SearchErrorReason; 4] = [
        SearchErrorReason::NotFound,
        SearchErrorReason::NotUnique,
        SearchErrorReason::SecondaryStorageNotSet,
        SearchErrorReason::Forbidden,
    ];

    pub fn is_retryable(self) -> bool {
        !Self::NON_RETRYABLE.contains(&self)
    }
}

impl fmt::Display for SearchErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchErrorReason::NotFound => "not_found",
            SearchErrorReason::NotUnique => "not_unique",
            SearchErrorReason::SecondaryStorageNotSet => "secondary_storage_not_set",
            SearchErrorReason::Forbidden => "forbidden",
            SearchErrorReason::InvalidArgument => "invalid_argument",
            SearchErrorReason::Internal => "internal",
            SearchErrorReason::Unavailable => "unavailable",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemSourceError {
    /// The backend ran the query and rejected it
    #[error("Search query failed ({reason}): {message}")]
    Search {
        reason: SearchErrorReason,
        message: String,
    },

    /// The backend could not be reached or timed out
    #[error("Item source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cursor '{0}'")]
    InvalidCursor(String),

    #[error("No item source registered for operation type {0}")]
    UnsupportedOperationType(BatchOperationType),
}

impl ItemSourceError {
    pub fn search(reason: SearchErrorReason, message: impl Into<String>) -> Self {
        ItemSourceError::Search {
            reason,
            message: message.into(),
        }
    }

    /// The backend reason when this is a search error
    pub fn search_reason(&self) -> Option<SearchErrorReason> {
        match self {
            ItemSourceError::Search { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
