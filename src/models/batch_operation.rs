use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::cursors;

/// Lifecycle status of a batch operation as persisted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationStatus {
    Created,
    Initialized,
    Active,
    Suspended,
    Completed,
    Cancelled,
    Failed,
}

impl BatchOperationStatus {
    /// Statuses the scheduler still has to drive through initialization
    pub fn is_pending_initialization(self) -> bool {
        matches!(
            self,
            BatchOperationStatus::Created | BatchOperationStatus::Suspended
        )
    }
}

impl fmt::Display for BatchOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchOperationStatus::Created => "created",
            BatchOperationStatus::Initialized => "initialized",
            BatchOperationStatus::Active => "active",
            BatchOperationStatus::Suspended => "suspended",
            BatchOperationStatus::Completed => "completed",
            BatchOperationStatus::Cancelled => "cancelled",
            BatchOperationStatus::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Declared kind of bulk action; selects the item source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperationType {
    CancelProcessInstance,
    ResolveIncident,
    MigrateProcessInstance,
    ModifyProcessInstance,
    DeleteProcessInstance,
}

impl fmt::Display for BatchOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchOperationType::CancelProcessInstance => "cancel_process_instance",
            BatchOperationType::ResolveIncident => "resolve_incident",
            BatchOperationType::MigrateProcessInstance => "migrate_process_instance",
            BatchOperationType::ModifyProcessInstance => "modify_process_instance",
            BatchOperationType::DeleteProcessInstance => "delete_process_instance",
        };
        write!(f, "{name}")
    }
}

/// Persisted batch operation as seen by the initialization core
///
/// The core never mutates this value; progress flows back into it only through the
/// follow-up commands it emits. Transition helpers return new values and exist for
/// the state adapters that apply those commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub key: i64,
    pub status: BatchOperationStatus,
    pub operation_type: BatchOperationType,
    /// `None` or empty means pagination has not started
    pub initialization_cursor: Option<String>,
    /// `0` means "use the configured default"
    pub page_size: u32,
    pub total_items_processed: u64,
}

impl BatchOperation {
    pub fn new(key: i64, operation_type: BatchOperationType) -> Self {
        Self {
            key,
            status: BatchOperationStatus::Created,
            operation_type,
            initialization_cursor: None,
            page_size: 0,
            total_items_processed: 0,
        }
    }

    pub fn with_status(self, status: BatchOperationStatus) -> Self {
        Self { status, ..self }
    }

    pub fn with_cursor(self, cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        Self {
            initialization_cursor: if cursor.is_empty() { None } else { Some(cursor) },
            ..self
        }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        Self { page_size, ..self }
    }

    pub fn with_items_processed(self, total_items_processed: u64) -> Self {
        Self {
            total_items_processed,
            ..self
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == BatchOperationStatus::Suspended
    }

    /// Cursor to resume from; the start sentinel when none was persisted
    pub fn cursor(&self) -> &str {
        self.initialization_cursor
            .as_deref()
            .unwrap_or(cursors::START)
    }

    /// Persisted page size, or `default_page_size` when unset
    pub fn effective_page_size(&self, default_page_size: u32) -> u32 {
        if self.page_size == 0 {
            default_page_size
        } else {
            self.page_size
        }
    }
}
