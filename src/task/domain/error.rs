//! Error types for task domain validation and parsing.

use super::{LifecycleAction, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or transitioning domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The priority is outside the accepted range.
    #[error("priority {0} is outside the accepted 1-5 range")]
    InvalidPriority(u8),

    /// The requested operation is not valid for the task's current state.
    #[error("cannot {action} task {task_id} in state '{from}'")]
    InvalidTransition {
        /// Task the operation targeted.
        task_id: TaskId,
        /// State the task was in when the operation arrived.
        from: TaskStatus,
        /// Operation that was rejected.
        action: LifecycleAction,
    },
}

/// Error returned while parsing task status columns from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid status columns: status='{status}', is_ongoing={is_ongoing}")]
pub struct ParseTaskStatusError {
    /// The persisted status discriminant.
    pub status: String,
    /// The persisted ongoing flag.
    pub is_ongoing: bool,
}

/// Error returned while parsing event kinds from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task event kind: {0}")]
pub struct ParseEventKindError(pub String);

/// Error returned while parsing session close reasons from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session close reason: {0}")]
pub struct ParseSessionCloseReasonError(pub String);
