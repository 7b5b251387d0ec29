//! Task aggregate root, lifecycle status machine, and insert payloads.

use super::{
    CardId, ParseTaskStatusError, ProjectId, TaskDomainError, TaskId, TaskTypeId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-state of a claimed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStage {
    /// The task is reserved by a user but not actively worked yet.
    Taken,
    /// The task is actively being worked, with a running work session.
    Ongoing,
}

/// Task lifecycle status.
///
/// A closed sum type: the claimed sub-state travels with the status so that
/// invalid combinations (an "ongoing" task nobody claimed) cannot be
/// represented. Persistence stores the pair as two columns and round-trips
/// through [`TaskStatus::columns`] / [`TaskStatus::from_columns`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The task is on the board, unclaimed.
    Available,
    /// The task is claimed by a user.
    Claimed(ClaimStage),
    /// The task is done. Terminal.
    Completed,
}

impl TaskStatus {
    /// Returns the status reached by applying `action`, or `None` when the
    /// transition is not part of the lifecycle state machine.
    #[must_use]
    pub const fn after(self, action: LifecycleAction) -> Option<Self> {
        match (self, action) {
            (Self::Available, LifecycleAction::Claim) => Some(Self::Claimed(ClaimStage::Taken)),
            (Self::Claimed(ClaimStage::Taken), LifecycleAction::Start) => {
                Some(Self::Claimed(ClaimStage::Ongoing))
            }
            (Self::Claimed(_), LifecycleAction::Release) => Some(Self::Available),
            (Self::Claimed(_), LifecycleAction::Complete) => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns the coarse status discriminant used by list filters.
    #[must_use]
    pub const fn kind(self) -> super::StatusKind {
        match self {
            Self::Available => super::StatusKind::Available,
            Self::Claimed(_) => super::StatusKind::Claimed,
            Self::Completed => super::StatusKind::Completed,
        }
    }

    /// Returns the canonical two-column storage representation.
    #[must_use]
    pub const fn columns(self) -> (&'static str, bool) {
        match self {
            Self::Available => ("available", false),
            Self::Claimed(ClaimStage::Taken) => ("claimed", false),
            Self::Claimed(ClaimStage::Ongoing) => ("claimed", true),
            Self::Completed => ("completed", false),
        }
    }

    /// Reconstructs a status from its two-column storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseTaskStatusError`] for an unknown discriminant or for
    /// `is_ongoing` set outside the claimed state; a half-valid pair is
    /// storage corruption, not something to normalise silently.
    pub fn from_columns(status: &str, is_ongoing: bool) -> Result<Self, ParseTaskStatusError> {
        match (status, is_ongoing) {
            ("available", false) => Ok(Self::Available),
            ("claimed", false) => Ok(Self::Claimed(ClaimStage::Taken)),
            ("claimed", true) => Ok(Self::Claimed(ClaimStage::Ongoing)),
            ("completed", false) => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError {
                status: status.to_owned(),
                is_ongoing,
            }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Claimed(ClaimStage::Taken) => write!(f, "claimed"),
            Self::Claimed(ClaimStage::Ongoing) => write!(f, "claimed/ongoing"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Lifecycle operation requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// Reserve an available task.
    Claim,
    /// Begin actively working a taken task.
    Start,
    /// Return a claimed task to the board.
    Release,
    /// Finish a claimed task.
    Complete,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Claim => "claim",
            Self::Start => "start",
            Self::Release => "release",
            Self::Complete => "complete",
        };
        write!(f, "{verb}")
    }
}

/// Validated task priority in the 1 (lowest) to 5 (highest) range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Creates a validated priority.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPriority`] when the value is
    /// outside 1-5.
    pub const fn new(value: u8) -> Result<Self, TaskDomainError> {
        if value >= 1 && value <= 5 {
            Ok(Self(value))
        } else {
            Err(TaskDomainError::InvalidPriority(value))
        }
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic task version used for optimistic concurrency control.
///
/// Starts at 1 on insert and increases by exactly 1 on every accepted
/// mutation. Callers present the version they believe is current; a
/// mismatch at write time rejects the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskVersion(i64);

impl TaskVersion {
    /// Version assigned to a freshly inserted task.
    pub const INITIAL: Self = Self(1);

    /// Wraps a persisted version value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version after one accepted mutation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the underlying counter value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task aggregate root.
///
/// Status and version are mutated exclusively by the lifecycle engine
/// through the store's guarded update; every other component reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    project_id: ProjectId,
    type_id: TaskTypeId,
    title: String,
    description: Option<String>,
    priority: Priority,
    status: TaskStatus,
    version: TaskVersion,
    card_id: Option<CardId>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted owning project.
    pub project_id: ProjectId,
    /// Persisted task type.
    pub type_id: TaskTypeId,
    /// Persisted title.
    pub title: String,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted priority.
    pub priority: Priority,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted version counter.
    pub version: TaskVersion,
    /// Persisted card membership, if any.
    pub card_id: Option<CardId>,
    /// Persisted creator.
    pub created_by: UserId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_record(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            type_id: record.type_id,
            title: record.title,
            description: record.description,
            priority: record.priority,
            status: record.status,
            version: record.version,
            card_id: record.card_id,
            created_by: record.created_by,
            created_at: record.created_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the task type.
    #[must_use]
    pub const fn type_id(&self) -> TaskTypeId {
        self.type_id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the task priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> TaskVersion {
        self.version
    }

    /// Returns the card this task belongs to, if any.
    #[must_use]
    pub const fn card_id(&self) -> Option<CardId> {
        self.card_id
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Applies an engine-approved status change, bumping the version.
    ///
    /// Adapter-internal: the lifecycle engine validates the transition and
    /// the store enforces the version guard before this runs.
    pub(crate) const fn advance(&mut self, status: TaskStatus) {
        self.status = status;
        self.version = self.version.next();
    }
}

/// Validated insert payload for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    id: TaskId,
    project_id: ProjectId,
    type_id: TaskTypeId,
    title: String,
    description: Option<String>,
    priority: Priority,
    card_id: Option<CardId>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl TaskDraft {
    /// Creates a draft with required fields, trimming the title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is empty
    /// after trimming.
    pub fn new(
        project_id: ProjectId,
        type_id: TaskTypeId,
        title: impl Into<String>,
        priority: Priority,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TaskDomainError> {
        let raw: String = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        Ok(Self {
            id: TaskId::new(),
            project_id,
            type_id,
            title: trimmed.to_owned(),
            description: None,
            priority,
            card_id: None,
            created_by,
            created_at,
        })
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the card the task belongs to.
    #[must_use]
    pub const fn with_card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }

    /// Returns the pre-assigned task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the task type.
    #[must_use]
    pub const fn type_id(&self) -> TaskTypeId {
        self.type_id
    }

    /// Returns the trimmed title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the card membership, if any.
    #[must_use]
    pub const fn card_id(&self) -> Option<CardId> {
        self.card_id
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl From<TaskDraft> for Task {
    fn from(draft: TaskDraft) -> Self {
        Self {
            id: draft.id,
            project_id: draft.project_id,
            type_id: draft.type_id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: TaskStatus::Available,
            version: TaskVersion::INITIAL,
            card_id: draft.card_id,
            created_by: draft.created_by,
            created_at: draft.created_at,
        }
    }
}
