//! The task lifecycle engine.
//!
//! One service method per externally exposed operation. Every mutating
//! operation runs as a single storage transaction: fetch, state-machine
//! validation, version-guarded update, audit event, and — for completion —
//! rule execution, committing or rolling back as one unit. The only work
//! outside that boundary is the best-effort work-session close after
//! release and complete, whose failures are logged and discarded.

use crate::automation::services::{run_completion_rules, RuleExecutionError};
use crate::task::domain::{
    Actor, CapabilityId, CardId, LifecycleAction, Priority, ProjectId, SessionCloseReason,
    StatusKind, Task, TaskDomainError, TaskDraft, TaskEvent, TaskEventKind, TaskId, TaskQuery,
    TaskTypeId, TaskVersion, UserId,
};
use crate::task::ports::{
    CapabilityError, CapabilityResolver, StoreTxn, TaskStore, TaskStoreError,
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation or transition failure.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Storage operation failure.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
    /// Capability resolver failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl From<RuleExecutionError> for TaskLifecycleError {
    fn from(err: RuleExecutionError) -> Self {
        match err {
            RuleExecutionError::Domain(domain) => Self::Domain(domain),
            RuleExecutionError::Store(store) => Self::Store(store),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Request payload for creating a task on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    project_id: ProjectId,
    type_id: TaskTypeId,
    title: String,
    description: Option<String>,
    priority: u8,
    card_id: Option<CardId>,
}

impl CreateTaskRequest {
    /// Creates a request with required fields.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        type_id: TaskTypeId,
        title: impl Into<String>,
        priority: u8,
    ) -> Self {
        Self {
            project_id,
            type_id,
            title: title.into(),
            description: None,
            priority,
            card_id: None,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Places the task on a card.
    #[must_use]
    pub const fn with_card(mut self, card_id: CardId) -> Self {
        self.card_id = Some(card_id);
        self
    }
}

/// Caller-supplied filters for task listings.
///
/// Status, type, and text are evaluated by the store; capability and
/// blocked need the external capability resolver and are applied by the
/// service on the store's result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    /// Restrict to tasks with this status kind.
    pub status: Option<StatusKind>,
    /// Restrict to tasks of this type.
    pub type_id: Option<TaskTypeId>,
    /// Restrict to task types tagged with this capability.
    pub capability_id: Option<CapabilityId>,
    /// Case-insensitive substring match over title and description.
    pub text_query: Option<String>,
    /// `true`: only tasks the caller cannot work (type outside their
    /// workable set); `false`: only tasks they can.
    pub blocked: Option<bool>,
}

impl TaskFilters {
    /// Creates an unrestricted filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a status kind.
    #[must_use]
    pub const fn with_status(mut self, status: StatusKind) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to a task type.
    #[must_use]
    pub const fn with_type(mut self, type_id: TaskTypeId) -> Self {
        self.type_id = Some(type_id);
        self
    }

    /// Restricts to types tagged with a capability.
    #[must_use]
    pub const fn with_capability(mut self, capability_id: CapabilityId) -> Self {
        self.capability_id = Some(capability_id);
        self
    }

    /// Restricts to tasks matching a text fragment.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_query = Some(text.into());
        self
    }

    /// Restricts by whether the caller can work the task's type.
    #[must_use]
    pub const fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = Some(blocked);
        self
    }
}

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<S, C, P>
where
    S: TaskStore,
    C: Clock + Send + Sync,
    P: CapabilityResolver,
{
    store: Arc<S>,
    clock: Arc<C>,
    capabilities: Arc<P>,
}

impl<S, C, P> TaskLifecycleService<S, C, P>
where
    S: TaskStore,
    C: Clock + Send + Sync,
    P: CapabilityResolver,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, capabilities: Arc<P>) -> Self {
        Self {
            store,
            clock,
            capabilities,
        }
    }

    /// Creates a new available task at version 1 and records its created
    /// event in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] on an empty title or invalid
    /// priority, and [`TaskLifecycleError::Store`] with
    /// [`TaskStoreError::InvalidReference`] when the task type does not
    /// resolve.
    pub async fn create_task(
        &self,
        actor: Actor,
        request: CreateTaskRequest,
    ) -> TaskLifecycleResult<Task> {
        let now = self.clock.utc();
        let priority = Priority::new(request.priority)?;
        let mut draft = TaskDraft::new(
            request.project_id,
            request.type_id,
            request.title,
            priority,
            actor.user_id,
            now,
        )?;
        if let Some(description) = request.description {
            draft = draft.with_description(description);
        }
        if let Some(card_id) = request.card_id {
            draft = draft.with_card(card_id);
        }

        self.store
            .with_transaction(move |txn: &mut dyn StoreTxn| -> TaskLifecycleResult<Task> {
                let task = txn.insert_task(&draft)?;
                txn.append_event(&TaskEvent::record(
                    actor,
                    task.project_id(),
                    task.id(),
                    TaskEventKind::Created,
                    now,
                ))?;
                Ok(task)
            })
            .await
    }

    /// Claims an available task for the acting user.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is not available, is
    /// missing, or the presented version is stale.
    pub async fn claim_task(
        &self,
        actor: Actor,
        task_id: TaskId,
        version: TaskVersion,
    ) -> TaskLifecycleResult<Task> {
        self.apply_transition(actor, task_id, version, LifecycleAction::Claim)
            .await
    }

    /// Starts active work on a taken task, opening a work session.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is not in the taken
    /// state, is missing, or the presented version is stale.
    pub async fn start_task(
        &self,
        actor: Actor,
        task_id: TaskId,
        version: TaskVersion,
    ) -> TaskLifecycleResult<Task> {
        self.apply_transition(actor, task_id, version, LifecycleAction::Start)
            .await
    }

    /// Releases a claimed task back to the board.
    ///
    /// Closes the acting user's open work session best-effort after the
    /// transition commits.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is not claimed, is
    /// missing, or the presented version is stale.
    pub async fn release_task(
        &self,
        actor: Actor,
        task_id: TaskId,
        version: TaskVersion,
    ) -> TaskLifecycleResult<Task> {
        self.apply_transition(actor, task_id, version, LifecycleAction::Release)
            .await
    }

    /// Completes a claimed task.
    ///
    /// Runs the completion-triggered automation rules inside the same
    /// transaction, then closes the acting user's open work session
    /// best-effort after commit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is not claimed, is
    /// missing, the presented version is stale, or automation fails — a
    /// failed rule rolls back the completion itself.
    pub async fn complete_task(
        &self,
        actor: Actor,
        task_id: TaskId,
        version: TaskVersion,
    ) -> TaskLifecycleResult<Task> {
        self.apply_transition(actor, task_id, version, LifecycleAction::Complete)
            .await
    }

    /// Lists a project's tasks matching the caller's filters.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] on storage failure and
    /// [`TaskLifecycleError::Capability`] when the capability resolver is
    /// needed and fails.
    pub async fn list_tasks(
        &self,
        actor: Actor,
        project_id: ProjectId,
        filters: TaskFilters,
    ) -> TaskLifecycleResult<Vec<Task>> {
        let query = TaskQuery {
            status: filters.status,
            type_id: filters.type_id,
            text: filters.text_query,
        };
        let mut tasks = self.store.list_tasks(project_id, &query).await?;

        if let Some(capability_id) = filters.capability_id {
            let tagged: HashSet<TaskTypeId> = self
                .capabilities
                .type_ids_with_capability(capability_id, project_id)
                .await?
                .into_iter()
                .collect();
            tasks.retain(|task| tagged.contains(&task.type_id()));
        }

        if let Some(blocked) = filters.blocked {
            let workable: HashSet<TaskTypeId> = self
                .capabilities
                .workable_type_ids(actor.user_id, project_id)
                .await?
                .into_iter()
                .collect();
            tasks.retain(|task| workable.contains(&task.type_id()) != blocked);
        }

        Ok(tasks)
    }

    /// Runs one state transition as a single transaction, then performs
    /// the post-commit best-effort session close where the action calls
    /// for one.
    async fn apply_transition(
        &self,
        actor: Actor,
        task_id: TaskId,
        presented: TaskVersion,
        action: LifecycleAction,
    ) -> TaskLifecycleResult<Task> {
        let now = self.clock.utc();
        let task = self
            .store
            .with_transaction(move |txn: &mut dyn StoreTxn| -> TaskLifecycleResult<Task> {
                let current = txn
                    .fetch_task(task_id)?
                    .ok_or_else(|| TaskStoreError::NotFoundOrConflict(task_id))?;
                // State validation comes before the version guard: asking
                // to complete a completed task is an invalid transition
                // even when the presented version is also stale.
                let next = current.status().after(action).ok_or_else(|| {
                    TaskDomainError::InvalidTransition {
                        task_id,
                        from: current.status(),
                        action,
                    }
                })?;
                let updated = txn
                    .update_status(task_id, presented, next)?
                    .ok_or_else(|| TaskStoreError::NotFoundOrConflict(task_id))?;
                txn.append_event(&TaskEvent::record(
                    actor,
                    updated.project_id(),
                    task_id,
                    TaskEventKind::from_action(action),
                    now,
                ))?;
                if action == LifecycleAction::Start {
                    txn.open_session(actor.user_id, task_id, now)?;
                }
                if action == LifecycleAction::Complete {
                    let derived = run_completion_rules(txn, actor, &updated, now)?;
                    if !derived.is_empty() {
                        debug!(
                            task_id = %task_id,
                            derived = derived.len(),
                            "automation derived follow-up tasks"
                        );
                    }
                }
                Ok(updated)
            })
            .await?;

        if let Some(reason) = close_reason(action) {
            self.close_session_best_effort(actor.user_id, task_id, reason)
                .await;
        }
        Ok(task)
    }

    /// Closes the actor's open work session, swallowing failures.
    ///
    /// The transition has already committed by the time this runs; a close
    /// failure leaves a stale timer, which is logged so it can be found,
    /// but never turns a successful release or completion into an error.
    async fn close_session_best_effort(
        &self,
        user_id: UserId,
        task_id: TaskId,
        reason: SessionCloseReason,
    ) {
        let closed_at = self.clock.utc();
        match self
            .store
            .close_work_session(user_id, task_id, reason, closed_at)
            .await
        {
            Ok(true) => {
                debug!(user_id = %user_id, task_id = %task_id, reason = reason.as_str(), "closed work session");
            }
            Ok(false) => {}
            Err(err) => {
                warn!(user_id = %user_id, task_id = %task_id, error = %err, "failed to close work session");
            }
        }
    }
}

/// Maps a lifecycle action to the session close reason it implies.
const fn close_reason(action: LifecycleAction) -> Option<SessionCloseReason> {
    match action {
        LifecycleAction::Release => Some(SessionCloseReason::Released),
        LifecycleAction::Complete => Some(SessionCloseReason::Completed),
        LifecycleAction::Claim | LifecycleAction::Start => None,
    }
}
