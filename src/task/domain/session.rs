//! Work sessions: timed intervals of active work on a claimed task.

use super::{ParseSessionCloseReasonError, SessionId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a work session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCloseReason {
    /// The task was released back to the board.
    Released,
    /// The task was completed.
    Completed,
}

impl SessionCloseReason {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for SessionCloseReason {
    type Error = ParseSessionCloseReasonError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "released" => Ok(Self::Released),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseSessionCloseReasonError(value.to_owned())),
        }
    }
}

/// A timer row for one user actively working one task.
///
/// At most one open session exists per `(user, task)` pair; opening while
/// one is open is a no-op, and closing is idempotent. Closing happens
/// best-effort from the lifecycle engine, so a session can outlive the
/// transition that should have closed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSession {
    /// Session identifier.
    pub id: SessionId,
    /// User the timer belongs to.
    pub user_id: UserId,
    /// Task being worked.
    pub task_id: TaskId,
    /// When active work started.
    pub opened_at: DateTime<Utc>,
    /// When the session ended, if it has.
    pub closed_at: Option<DateTime<Utc>>,
    /// Why the session ended, if it has.
    pub close_reason: Option<SessionCloseReason>,
}

impl WorkSession {
    /// Opens a new session for a user starting work on a task.
    #[must_use]
    pub fn open(user_id: UserId, task_id: TaskId, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            task_id,
            opened_at,
            closed_at: None,
            close_reason: None,
        }
    }

    /// Returns whether the session is still running.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}
