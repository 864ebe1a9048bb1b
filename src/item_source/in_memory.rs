//! Vector-backed item source with scripted failures.
//!
//! Cursors are decimal offsets into the item vector. Used by the reference partition
//! driver, the benchmarks, and the test suites.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::{ItemSource, ItemSourceError};
use crate::models::{Item, ItemPage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub cursor: String,
    pub page_size: u32,
}

#[derive(Debug, Default)]
struct FetchLog {
    requests: Vec<FetchRequest>,
    failures: HashMap<usize, ItemSourceError>,
}

#[derive(Debug, Default)]
pub struct InMemoryItemSource {
    items: Vec<Item>,
    log: Mutex<FetchLog>,
}

impl InMemoryItemSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            log: Mutex::new(FetchLog::default()),
        }
    }

    /// Items `1..=count`, each in its own scope
    pub fn with_sequential_items(count: usize) -> Self {
        let items = (1..=count as i64).map(|key| Item::new(key, key * 1_000)).collect();
        Self::new(items)
    }

    /// Fail the fetch with zero-based index `fetch_index` with `error`
    pub fn fail_on_fetch(self, fetch_index: usize, error: ItemSourceError) -> Self {
        self.log.lock().failures.insert(fetch_index, error);
        self
    }

    /// Every fetch seen so far, in call order
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.log.lock().requests.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.log.lock().requests.len()
    }

    fn parse_offset(&self, cursor: &str) -> Result<usize, ItemSourceError> {
        if cursor.is_empty() {
            return Ok(0);
        }
        cursor
            .parse::<usize>()
            .map_err(|_| ItemSourceError::InvalidCursor(cursor.to_string()))
    }
}

impl ItemSource for InMemoryItemSource {
    fn fetch_page(&self, cursor: &str, page_size: u32) -> Result<ItemPage, ItemSourceError> {
        let fetch_index = {
            let mut log = self.log.lock();
            log.requests.push(FetchRequest {
                cursor: cursor.to_string(),
                page_size,
            });
            log.requests.len() - 1
        };

        if let Some(error) = self.log.lock().failures.remove(&fetch_index) {
            return Err(error);
        }

        let start = self.parse_offset(cursor)?.min(self.items.len());
        let end = start
            .saturating_add(page_size as usize)
            .min(self.items.len());

        Ok(ItemPage::new(
            self.items[start..end].to_vec(),
            Some(end.to_string()),
            self.items.len() as u64,
            end >= self.items.len(),
        ))
    }
}
