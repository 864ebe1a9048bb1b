//! # Batch Operation Initialization
//!
//! Turns a declarative batch operation ("cancel every process instance matching this
//! filter") into the ordered stream of chunk commands its execution works through.
//!
//! ## Architecture
//!
//! Initialization runs on the partition's single logical thread, one tick at a time.
//! Every tick reads the persisted cursor, does bounded work, and records where it
//! stopped, so a crash or leader change replays into the same position.
//!
//! ## Core Components
//!
//! - **BatchOperationInitializationScheduler**: Fixed-interval entry point with an
//!   in-memory idempotency guard and one-off retry scheduling
//! - **BatchOperationRetryHandler**: Classifies failures into success / retry / terminal
//!   with exponential backoff
//! - **BatchOperationInitializer**: Page-fetch / chunk-emit loop with backpressure
//! - **BatchOperationPageProcessor**: Splits a page into capacity-checked chunks
//! - **BatchOperationCommandEmitter**: Builds every follow-up command
//! - **InitializationContext**: Immutable per-tick progress

pub mod command_emitter;
pub mod context;
pub mod errors;
pub mod initializer;
pub mod page_processor;
pub mod retry_handler;
pub mod scheduler;

pub use command_emitter::BatchOperationCommandEmitter;
pub use context::InitializationContext;
pub use errors::{InitializationCause, InitializationFailure};
pub use initializer::{BatchOperationInitializer, InitializationOutcome};
pub use page_processor::{BatchOperationPageProcessor, PageProcessingResult};
pub use retry_handler::{BatchOperationRetryHandler, RetryResult};
pub use scheduler::BatchOperationInitializationScheduler;
