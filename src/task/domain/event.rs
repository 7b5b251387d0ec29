//! Append-only lifecycle audit events.

use super::{
    Actor, EventId, LifecycleAction, OrgId, ParseEventKindError, ProjectId, TaskId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of lifecycle event recorded against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// The task was inserted on the board.
    Created,
    /// The task was claimed by a user.
    Claimed,
    /// Active work on the task started.
    Started,
    /// The task was returned to the board.
    Released,
    /// The task was completed.
    Completed,
}

impl TaskEventKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Claimed => "claimed",
            Self::Started => "started",
            Self::Released => "released",
            Self::Completed => "completed",
        }
    }

    /// Returns the event kind recorded for an accepted lifecycle action.
    #[must_use]
    pub const fn from_action(action: LifecycleAction) -> Self {
        match action {
            LifecycleAction::Claim => Self::Claimed,
            LifecycleAction::Start => Self::Started,
            LifecycleAction::Release => Self::Released,
            LifecycleAction::Complete => Self::Completed,
        }
    }
}

impl TryFrom<&str> for TaskEventKind {
    type Error = ParseEventKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created" => Ok(Self::Created),
            "claimed" => Ok(Self::Claimed),
            "started" => Ok(Self::Started),
            "released" => Ok(Self::Released),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEventKindError(value.to_owned())),
        }
    }
}

/// One immutable audit record: who did what to which task, and when.
///
/// Events are append-only; nothing in the engine mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Event identifier.
    pub id: EventId,
    /// Organization scope.
    pub org_id: OrgId,
    /// Project scope.
    pub project_id: ProjectId,
    /// Task the event belongs to.
    pub task_id: TaskId,
    /// User who performed the operation.
    pub actor_id: UserId,
    /// What happened.
    pub kind: TaskEventKind,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Builds an event for an operation an actor performed on a task.
    #[must_use]
    pub fn record(
        actor: Actor,
        project_id: ProjectId,
        task_id: TaskId,
        kind: TaskEventKind,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            org_id: actor.org_id,
            project_id,
            task_id,
            actor_id: actor.user_id,
            kind,
            recorded_at,
        }
    }
}
