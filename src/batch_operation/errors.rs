//! Failure values produced by the initialization loop.

use std::fmt;
use thiserror::Error;

use crate::item_source::{ItemSourceError, SearchErrorReason};
use crate::processing::SinkError;
use crate::records::BatchOperationErrorType;

/// Underlying fault of an [`InitializationFailure`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitializationCause {
    #[error(transparent)]
    ItemSource(#[from] ItemSourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// A failed initialization attempt together with where to resume
///
/// The resumable cursor is the last page boundary whose chunks were committed, or the
/// tick's starting cursor when nothing was committed.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializationFailure {
    pub message: String,
    pub error_type: BatchOperationErrorType,
    pub resumable_cursor: String,
    pub cause: Option<InitializationCause>,
}

impl InitializationFailure {
    pub fn new(
        message: impl Into<String>,
        error_type: BatchOperationErrorType,
        resumable_cursor: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            error_type,
            resumable_cursor: resumable_cursor.into(),
            cause: None,
        }
    }

    pub fn with_cause(self, cause: impl Into<InitializationCause>) -> Self {
        Self {
            cause: Some(cause.into()),
            ..self
        }
    }

    /// A failed page fetch
    pub fn from_item_source(error: ItemSourceError, resumable_cursor: impl Into<String>) -> Self {
        let error_type = match &error {
            ItemSourceError::UnsupportedOperationType(_) => BatchOperationErrorType::Unknown,
            _ => BatchOperationErrorType::QueryFailed,
        };
        Self::new(error.to_string(), error_type, resumable_cursor).with_cause(error)
    }

    /// A command that could not be written
    pub fn from_sink(error: SinkError, resumable_cursor: impl Into<String>) -> Self {
        Self::new(
            error.to_string(),
            BatchOperationErrorType::Unknown,
            resumable_cursor,
        )
        .with_cause(error)
    }

    /// Backend reason when the cause is a rejected search
    pub fn search_reason(&self) -> Option<SearchErrorReason> {
        match &self.cause {
            Some(InitializationCause::ItemSource(error)) => error.search_reason(),
            _ => None,
        }
    }
}

impl fmt::Display for InitializationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch operation initialization failed ({}) at cursor '{}': {}",
            self.error_type, self.resumable_cursor, self.message
        )
    }
}

impl std::error::Error for InitializationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
