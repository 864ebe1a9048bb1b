pub mod strategies;

pub use builders::*;
pub use mocks::*;
pub use strategies::*;

use batchops_core::processing::AppendedCommand;
use batchops_core::records::{CommandRecord, Intent};

/// Item keys of every chunk command in `log`, in log order
pub fn chunked_item_keys(log: &[AppendedCommand]) -> Vec<i64> {
    log.iter()
        .filter_map(|command| match &command.record {
            CommandRecord::Chunk(chunk) => Some(chunk.items.iter().map(|item| item.item_key)),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Number of commands in `log` carrying `intent`
pub fn count_intent(log: &[AppendedCommand], intent: Intent) -> usize {
    log.iter().filter(|command| command.intent == intent).count()
}
