//! Storage port for tasks, events, sessions, and automation bookkeeping.
//!
//! The port is split in two layers. [`TaskStore`] is the async contract the
//! lifecycle service holds; its [`TaskStore::with_transaction`] method runs
//! a closure against a [`StoreTxn`] inside exactly one storage transaction,
//! committing on `Ok` and rolling the whole unit back on `Err`. Everything
//! a transition touches — the guarded status update, audit events, session
//! opening, rule matching, execution receipts, derived-task inserts — goes
//! through that one transaction, which is the engine's sole concurrency
//! boundary.

use crate::automation::domain::{RuleExecution, RuleId, RuleMatch, TriggerEvent};
use crate::task::domain::{
    ProjectId, SessionCloseReason, Task, TaskDraft, TaskEvent, TaskId, TaskQuery, TaskStatus,
    TaskTypeId, TaskVersion, UserId, WorkSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, TaskStoreError>;

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// The task does not exist, or the presented version is stale.
    ///
    /// Deliberately not distinguished: the guarded update observes zero
    /// affected rows either way, and a caller holding a stale version has
    /// to re-read before retrying regardless.
    #[error("task {0} not found or version conflict")]
    NotFoundOrConflict(TaskId),

    /// A foreign reference (task type, workflow, ...) does not resolve.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Storage-layer failure, wrapped and surfaced opaquely.
    #[error("storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a storage-layer error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}

/// Operations available inside one storage transaction.
///
/// Implementations are synchronous: the Postgres adapter drives a Diesel
/// connection from a blocking thread, and the in-memory adapter mutates a
/// scratch copy of its state.
pub trait StoreTxn {
    /// Inserts a new task at version 1 in the available state.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::InvalidReference`] when the draft's task
    /// type does not resolve.
    fn insert_task(&mut self, draft: &TaskDraft) -> StoreResult<Task>;

    /// Fetches a task by identifier.
    fn fetch_task(&mut self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Applies a status change guarded by the version compare-and-set.
    ///
    /// The update takes effect only where the stored version equals
    /// `expected`; the new version is `expected + 1`. Returns the updated
    /// task, or `None` when zero rows matched — the task is missing or the
    /// version is stale, indistinguishably.
    fn update_status(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        status: TaskStatus,
    ) -> StoreResult<Option<Task>>;

    /// Appends one immutable lifecycle audit event.
    fn append_event(&mut self, event: &TaskEvent) -> StoreResult<()>;

    /// Opens a work session for a user on a task.
    ///
    /// A no-op when an open session already exists for the pair, so a
    /// session that missed its best-effort close cannot wedge the tracker.
    fn open_session(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        opened_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Returns the active rules matching a project, source type, and
    /// trigger, each with its attached templates.
    ///
    /// Only rules whose workflow belongs to `project_id` are considered;
    /// ordering is ascending rule id so repeated runs are deterministic.
    fn matching_rules(
        &mut self,
        project_id: ProjectId,
        source_type: TaskTypeId,
        trigger: TriggerEvent,
    ) -> StoreResult<Vec<RuleMatch>>;

    /// Claims the execution receipt for a rule firing on a source task.
    ///
    /// Returns `true` when the receipt was inserted, `false` when one
    /// already existed — the rule has fired for this task before and must
    /// be skipped.
    fn claim_execution(
        &mut self,
        rule_id: RuleId,
        source_task_id: TaskId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

/// Task persistence contract held by the lifecycle service.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Runs `work` inside one storage transaction.
    ///
    /// The transaction commits when the closure returns `Ok` and rolls
    /// back entirely on `Err` — including everything automation wrote.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a [`TaskStoreError`] (converted via
    /// `E: From<TaskStoreError>`) when the transaction machinery itself
    /// fails.
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static;

    /// Fetches a task by identifier.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Lists a project's tasks matching the store-evaluable filters,
    /// ordered by creation time then id.
    async fn list_tasks(&self, project_id: ProjectId, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Returns a task's audit events in recording order.
    async fn task_events(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>>;

    /// Returns the execution receipts recorded against a source task.
    async fn execution_receipts(&self, source_task_id: TaskId) -> StoreResult<Vec<RuleExecution>>;

    /// Returns the open work session for a user/task pair, if any.
    async fn find_open_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> StoreResult<Option<WorkSession>>;

    /// Returns every work session recorded against a task.
    async fn work_sessions(&self, task_id: TaskId) -> StoreResult<Vec<WorkSession>>;

    /// Closes the open work session for a user/task pair, if one exists.
    ///
    /// Idempotent: returns `true` when a session was actually closed and
    /// `false` when none was open. Runs outside the transition transaction
    /// deliberately — the lifecycle engine invokes it best-effort after
    /// commit and discards failures.
    async fn close_work_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
        reason: SessionCloseReason,
        closed_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
