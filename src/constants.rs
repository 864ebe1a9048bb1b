//! # System Constants
//!
//! Sentinels and defaults that define the operational boundaries of batch operation
//! initialization. Values here are part of the replayed command stream, so changing
//! them changes the output of a replay.

/// Cursor sentinels understood by the initializer and the downstream processors
pub mod cursors {
    /// Encodes "no cursor yet": pagination starts at the beginning of the data
    pub const START: &str = "";

    /// Terminal cursor reported once initialization has emitted its last page
    pub const FINISHED: &str = "finished";
}

/// Default values for [`BatchOperationConfig`](crate::config::BatchOperationConfig)
pub mod defaults {
    pub const SCHEDULER_INTERVAL_MS: u64 = 1_000;
    pub const CHUNK_SIZE: usize = 100;
    pub const QUERY_PAGE_SIZE: u32 = 10_000;
    pub const QUERY_RETRY_MAX: u32 = 3;
    pub const QUERY_RETRY_INITIAL_DELAY_MS: u64 = 1_000;
    pub const QUERY_RETRY_MAX_DELAY_MS: u64 = 60_000;
    pub const QUERY_RETRY_BACKOFF_FACTOR: f64 = 2.0;
    pub const PARTITION_ID: u32 = 1;
    pub const MAX_COMMAND_BATCH_BYTES: usize = 4 * 1024 * 1024;
}

/// Fixed per-record framing added to the encoded size of every buffered command
pub const RECORD_FRAMING_BYTES: usize = 64;

/// Upper bound on the JSON-escaped error message of a permanent-failure record.
/// Keeps the whole record inside the sink's lifecycle reserve.
pub const MAX_ERROR_MESSAGE_BYTES: usize = 512;

/// Names used for the `operation` field of structured log events
pub mod log_operations {
    pub const TICK: &str = "initialization_tick";
    pub const RETRY: &str = "initialization_retry";
    pub const INITIALIZE: &str = "initialize";
    pub const CONTINUE: &str = "continue_initialization";
    pub const FINISH: &str = "finish_initialization";
    pub const FAIL: &str = "fail";
}
