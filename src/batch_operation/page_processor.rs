//! # Page Processor
//!
//! Splits one item page into chunk-creation commands under the sink's capacity
//! check. Emission stops at the first refused chunk; chunks already appended stay.

use tracing::debug;

use super::command_emitter::BatchOperationCommandEmitter;
use crate::models::ItemPage;
use crate::processing::{CommandSink, SinkError};
use crate::records::FollowUpCommandMetadata;

/// Outcome of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProcessingResult {
    /// At least one chunk was appended, or the page was empty
    pub chunk_committed: bool,
    /// The page's next cursor
    pub cursor: Option<String>,
    /// Item count of the whole page, even when emission stopped early
    pub items_processed: u64,
    pub is_last_page: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOperationPageProcessor {
    chunk_size: usize,
    emitter: BatchOperationCommandEmitter,
}

impl BatchOperationPageProcessor {
    /// `chunk_size` of zero is treated as one
    pub fn new(chunk_size: usize, emitter: BatchOperationCommandEmitter) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            emitter,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn process_page(
        &self,
        batch_operation_key: i64,
        page: &ItemPage,
        sink: &mut dyn CommandSink,
    ) -> Result<PageProcessingResult, SinkError> {
        let mut result = PageProcessingResult {
            chunk_committed: page.is_empty(),
            cursor: page.next_cursor.clone(),
            items_processed: page.len() as u64,
            is_last_page: page.is_last_page,
        };

        let metadata = FollowUpCommandMetadata::for_batch_operation(batch_operation_key);
        let mut emitted = 0usize;
        for chunk in page.items.chunks(self.chunk_size) {
            let record = BatchOperationCommandEmitter::chunk_record(batch_operation_key, chunk);
            if !sink.can_append_records(std::slice::from_ref(&record), &metadata) {
                debug!(
                    batch_operation_key = batch_operation_key,
                    emitted_chunks = emitted,
                    page_items = page.len(),
                    "Command buffer full, stopping chunk emission for this page"
                );
                break;
            }
            self.emitter
                .create_chunk(sink, batch_operation_key, record)?;
            emitted += 1;
            result.chunk_committed = true;
        }

        Ok(result)
    }
}
