//! Store-level filter for task listings.

use super::TaskTypeId;
use serde::{Deserialize, Serialize};

/// Coarse status discriminant used by list filters.
///
/// Filters do not distinguish the claimed sub-states; a board column shows
/// taken and ongoing tasks together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Unclaimed tasks.
    Available,
    /// Claimed tasks, taken or ongoing.
    Claimed,
    /// Completed tasks.
    Completed,
}

impl StatusKind {
    /// Returns the status column discriminant this kind matches.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Claimed => "claimed",
            Self::Completed => "completed",
        }
    }
}

/// Filter criteria the store can evaluate directly.
///
/// Capability and blocked filtering need the external capability resolver
/// and are applied by the lifecycle service on top of this query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Restrict to tasks with this status kind.
    pub status: Option<StatusKind>,
    /// Restrict to tasks of this type.
    pub type_id: Option<TaskTypeId>,
    /// Case-insensitive substring match over title and description.
    pub text: Option<String>,
}

impl TaskQuery {
    /// Creates an unrestricted query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to a status kind.
    #[must_use]
    pub const fn with_status(mut self, status: StatusKind) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the query to a task type.
    #[must_use]
    pub const fn with_type(mut self, type_id: TaskTypeId) -> Self {
        self.type_id = Some(type_id);
        self
    }

    /// Restricts the query to tasks matching a text fragment.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
