use thiserror::Error;

use crate::config::ConfigurationError;
use crate::item_source::ItemSourceError;
use crate::processing::SinkError;

/// Crate-level error for everything outside the initialization loop itself.
///
/// Failures *inside* a tick are modeled as
/// [`InitializationFailure`](crate::batch_operation::InitializationFailure) values and
/// never surface through this type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchOpsError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Item source error: {0}")]
    ItemSourceError(String),
    #[error("Command sink error: {0}")]
    SinkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<ConfigurationError> for BatchOpsError {
    fn from(error: ConfigurationError) -> Self {
        BatchOpsError::ConfigurationError(error.to_string())
    }
}

impl From<ItemSourceError> for BatchOpsError {
    fn from(error: ItemSourceError) -> Self {
        BatchOpsError::ItemSourceError(error.to_string())
    }
}

impl From<SinkError> for BatchOpsError {
    fn from(error: SinkError) -> Self {
        BatchOpsError::SinkError(error.to_string())
    }
}

impl From<serde_json::Error> for BatchOpsError {
    fn from(error: serde_json::Error) -> Self {
        BatchOpsError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, BatchOpsError>;
