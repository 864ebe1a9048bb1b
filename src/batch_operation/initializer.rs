//! # Batch Operation Initializer
//!
//! Runs the page-fetch / chunk-emit loop for one operation within one tick.
//!
//! ## Flow
//!
//! 1. Suspended operations are a no-op: nothing fetched, nothing emitted.
//! 2. Pages are fetched from the operation's item source starting at the persisted
//!    cursor and handed to the page processor.
//! 3. A page without a committed chunk means the tick's output is full: one
//!    continue-initialization command with the last committed cursor and a halved
//!    page size ends the tick.
//! 4. The last page ends initialization with finish-initialization followed by
//!    begin-execution.
//!
//! Every fault leaves as an [`InitializationFailure`] carrying the cursor to resume
//! from. The outcome depends only on the operation and the item source's answers.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::command_emitter::BatchOperationCommandEmitter;
use super::context::InitializationContext;
use super::errors::InitializationFailure;
use super::page_processor::BatchOperationPageProcessor;
use crate::constants::cursors;
use crate::item_source::{ItemSource, ItemSourceFactory};
use crate::models::BatchOperation;
use crate::processing::CommandSink;

/// Non-failing result of one initialization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitializationOutcome {
    /// The last page was processed; finish and execute commands were emitted
    Finished { items_processed: u64 },
    /// The operation is suspended; its cursor is untouched
    Suspended { cursor: String },
    /// Output was exhausted; a continue-initialization command was emitted
    Continue { cursor: String, page_size: u32 },
}

impl InitializationOutcome {
    /// Cursor reported for this outcome, the finished sentinel when done
    pub fn cursor(&self) -> &str {
        match self {
            InitializationOutcome::Finished { .. } => cursors::FINISHED,
            InitializationOutcome::Suspended { cursor } => cursor,
            InitializationOutcome::Continue { cursor, .. } => cursor,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, InitializationOutcome::Finished { .. })
    }
}

pub struct BatchOperationInitializer {
    item_sources: Arc<dyn ItemSourceFactory>,
    page_processor: BatchOperationPageProcessor,
    emitter: BatchOperationCommandEmitter,
    default_page_size: u32,
}

impl std::fmt::Debug for BatchOperationInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOperationInitializer")
            .field("page_processor", &self.page_processor)
            .field("emitter", &self.emitter)
            .field("default_page_size", &self.default_page_size)
            .finish_non_exhaustive()
    }
}

impl BatchOperationInitializer {
    pub fn new(
        item_sources: Arc<dyn ItemSourceFactory>,
        page_processor: BatchOperationPageProcessor,
        emitter: BatchOperationCommandEmitter,
        default_page_size: u32,
    ) -> Self {
        Self {
            item_sources,
            page_processor,
            emitter,
            default_page_size,
        }
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    #[instrument(skip(self, operation, sink), fields(batch_operation_key = operation.key, cursor = %operation.cursor()))]
    pub fn initialize(
        &self,
        operation: &BatchOperation,
        sink: &mut dyn CommandSink,
    ) -> Result<InitializationOutcome, InitializationFailure> {
        if operation.is_suspended() {
            debug!("Batch operation is suspended, skipping initialization");
            return Ok(InitializationOutcome::Suspended {
                cursor: operation.cursor().to_string(),
            });
        }

        let start_cursor = operation.cursor().to_string();
        let source = self
            .item_sources
            .item_source_for(operation)
            .map_err(|e| InitializationFailure::from_item_source(e, start_cursor.clone()))?;

        let context = InitializationContext::from_operation(operation, self.default_page_size);
        self.run_pages(operation, source.as_ref(), context, &start_cursor, sink)
    }

    fn run_pages(
        &self,
        operation: &BatchOperation,
        source: &dyn ItemSource,
        mut context: InitializationContext,
        start_cursor: &str,
        sink: &mut dyn CommandSink,
    ) -> Result<InitializationOutcome, InitializationFailure> {
        loop {
            let page = source
                .fetch_page(context.cursor(), context.page_size())
                .map_err(|e| {
                    let resumable = if context.chunk_committed() {
                        context.cursor()
                    } else {
                        start_cursor
                    };
                    InitializationFailure::from_item_source(e, resumable)
                })?;

            let result = self
                .page_processor
                .process_page(operation.key, &page, sink)
                .map_err(|e| InitializationFailure::from_sink(e, context.cursor()))?;

            if !result.chunk_committed {
                let shrunk = context.with_halved_page_size();
                self.emitter
                    .continue_initialization(sink, operation.key, shrunk.cursor(), shrunk.page_size())
                    .map_err(|e| InitializationFailure::from_sink(e, shrunk.cursor()))?;

                info!(
                    cursor = %shrunk.cursor(),
                    page_size = shrunk.page_size(),
                    items_processed = shrunk.items_processed(),
                    "Command buffer exhausted, continuing initialization next tick"
                );
                return Ok(InitializationOutcome::Continue {
                    cursor: shrunk.cursor().to_string(),
                    page_size: shrunk.page_size(),
                });
            }

            // A partly committed page still advances to the page's cursor and counts
            // every item on it; the refused tail of that page is not revisited.
            let next_cursor = result
                .cursor
                .unwrap_or_else(|| context.cursor().to_string());
            context = context.with_next_page(next_cursor, result.items_processed, true);

            if result.is_last_page {
                let resumable = context.cursor().to_string();
                self.emitter
                    .finish_initialization(sink, operation.key)
                    .map_err(|e| InitializationFailure::from_sink(e, resumable.clone()))?;
                self.emitter
                    .begin_execution(sink, operation.key)
                    .map_err(|e| InitializationFailure::from_sink(e, resumable))?;

                let items_processed = operation.total_items_processed + context.items_processed();
                info!(
                    items_processed = items_processed,
                    "Batch operation initialization finished"
                );
                return Ok(InitializationOutcome::Finished { items_processed });
            }

            debug!(
                cursor = %context.cursor(),
                items_processed = context.items_processed(),
                "Page committed, fetching next page"
            );
        }
    }
}
