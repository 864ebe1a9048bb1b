#![allow(dead_code)]

use proptest::prelude::*;

use batchops_core::item_source::SearchErrorReason;
use batchops_core::models::{Item, ItemPage};

/// Strategy for generating a page of up to `max_items` items with distinct keys
pub fn item_page_strategy(max_items: usize) -> impl Strategy<Value = ItemPage> {
    (0..=max_items, any::<bool>()).prop_map(|(count, is_last_page)| {
        let items = (1..=count as i64).map(|key| Item::new(key, key % 7)).collect();
        ItemPage::new(items, Some(count.to_string()), count as u64, is_last_page)
    })
}

/// Strategy for generating chunk sizes
pub fn chunk_size_strategy() -> impl Strategy<Value = usize> {
    1usize..64
}

/// Strategy for generating `(initial_ms, max_ms, factor)` backoff settings
pub fn backoff_strategy() -> impl Strategy<Value = (u64, u64, f64)> {
    (1u64..10_000, 0u64..600_000, 1.0f64..4.0)
        .prop_map(|(initial_ms, extra_ms, factor)| (initial_ms, initial_ms + extra_ms, factor))
}

/// Strategy for generating any search rejection reason
pub fn search_reason_strategy() -> impl Strategy<Value = SearchErrorReason> {
    prop_oneof![
        Just(SearchErrorReason::NotFound),
        Just(SearchErrorReason::NotUnique),
        Just(SearchErrorReason::SecondaryStorageNotSet),
        Just(SearchErrorReason::Forbidden),
        Just(SearchErrorReason::InvalidArgument),
        Just(SearchErrorReason::Internal),
        Just(SearchErrorReason::Unavailable),
    ]
}
