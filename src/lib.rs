#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Operations Core
//!
//! Initialization core for partitioned batch operations.
//!
//! ## Overview
//!
//! A batch operation declares *what* to act on ("cancel every process instance matching
//! this filter"). Before it can execute, the matching items have to be resolved from a
//! paginated query backend and written, in bounded chunks, into the partition's
//! replicated command log. This crate does that resolution incrementally, one bounded
//! tick at a time, so that crashes, leader changes and backend faults always resume
//! from the last committed page.
//!
//! ## Architecture
//!
//! Everything runs on the partition's single logical thread. The host owns the
//! replicated log and the timer; this crate reads persisted state, fetches pages,
//! and emits commands into a capacity-checked sink.
//!
//! ## Module Organization
//!
//! - [`batch_operation`] - Scheduler, retry handler, initializer, page processor, emitter
//! - [`item_source`] - Paginated query backend contract and reference sources
//! - [`processing`] - Command sink, delayed-task scheduling, reference partition driver
//! - [`state`] - Read access to persisted batch operations
//! - [`records`] - Follow-up command records and intents
//! - [`models`] - Batch operations, items and pages
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batchops_core::config::ConfigManager;
//! use batchops_core::item_source::{InMemoryItemSource, ItemSourceRegistry};
//! use batchops_core::models::{BatchOperation, BatchOperationType};
//! use batchops_core::processing::PartitionDriver;
//! use batchops_core::state::InMemoryBatchOperationState;
//!
//! # fn example() -> batchops_core::Result<()> {
//! batchops_core::logging::init_structured_logging();
//! let config_manager = ConfigManager::load()?;
//!
//! let state = Arc::new(InMemoryBatchOperationState::new());
//! state.insert(BatchOperation::new(1, BatchOperationType::CancelProcessInstance));
//! let sources = ItemSourceRegistry::new().with_source(
//!     BatchOperationType::CancelProcessInstance,
//!     Arc::new(InMemoryItemSource::with_sequential_items(250)),
//! );
//!
//! let mut driver = PartitionDriver::new(config_manager.config(), state, Arc::new(sources));
//! driver.start();
//! while let Some(report) = driver.step() {
//!     if report.result.is_some() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch_operation;
pub mod config;
pub mod constants;
pub mod error;
pub mod item_source;
pub mod logging;
pub mod models;
pub mod processing;
pub mod records;
pub mod state;

pub use batch_operation::{
    BatchOperationCommandEmitter, BatchOperationInitializationScheduler,
    BatchOperationInitializer, BatchOperationPageProcessor, BatchOperationRetryHandler,
    InitializationFailure, InitializationOutcome, RetryResult,
};
pub use config::{BatchOperationConfig, ConfigManager};
pub use error::{BatchOpsError, Result};
pub use item_source::{ItemSource, ItemSourceError, ItemSourceFactory};
pub use models::{BatchOperation, BatchOperationStatus, BatchOperationType, Item, ItemPage};
pub use processing::{CommandBuffer, CommandSink, PartitionDriver, ScheduleService};
pub use state::BatchOperationState;
