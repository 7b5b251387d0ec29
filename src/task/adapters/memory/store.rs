//! Thread-safe in-memory task store with transactional semantics.
//!
//! Transactions are modelled by running the closure against a clone of the
//! whole board state and swapping the clone in only on success, so an
//! aborted transition rolls back derived tasks, events, and receipts
//! exactly like the database adapter does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::automation::domain::{
    Rule, RuleExecution, RuleId, RuleMatch, TaskTemplate, TriggerEvent, Workflow, WorkflowId,
};
use crate::task::{
    domain::{
        ProjectId, SessionCloseReason, Task, TaskDraft, TaskEvent, TaskId, TaskQuery, TaskStatus,
        TaskTypeId, TaskVersion, UserId, WorkSession,
    },
    ports::{StoreResult, StoreTxn, TaskStore, TaskStoreError},
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<BoardState>>,
}

#[derive(Debug, Clone, Default)]
struct BoardState {
    tasks: HashMap<TaskId, Task>,
    events: Vec<TaskEvent>,
    sessions: Vec<WorkSession>,
    task_types: HashSet<TaskTypeId>,
    workflows: HashMap<WorkflowId, Workflow>,
    rules: Vec<(Rule, Vec<TaskTemplate>)>,
    executions: Vec<RuleExecution>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task type, standing in for the admin type catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Storage`] when the state lock is poisoned.
    pub fn seed_task_type(&self, type_id: TaskTypeId) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.task_types.insert(type_id);
        Ok(())
    }

    /// Registers a workflow, standing in for the admin workflow screens.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Storage`] when the state lock is poisoned.
    pub fn seed_workflow(&self, workflow: Workflow) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.workflows.insert(workflow.id, workflow);
        Ok(())
    }

    /// Registers a rule with its attached templates.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::InvalidReference`] when the rule's
    /// workflow has not been seeded, or [`TaskStoreError::Storage`] when
    /// the state lock is poisoned.
    pub fn seed_rule(&self, rule: Rule, templates: Vec<TaskTemplate>) -> StoreResult<()> {
        let mut state = self.lock()?;
        if !state.workflows.contains_key(&rule.workflow_id) {
            return Err(TaskStoreError::InvalidReference(format!(
                "workflow {}",
                rule.workflow_id
            )));
        }
        state.rules.push((rule, templates));
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BoardState>> {
        self.state
            .lock()
            .map_err(|err| TaskStoreError::storage(std::io::Error::other(err.to_string())))
    }
}

struct MemoryTxn<'a> {
    state: &'a mut BoardState,
}

impl StoreTxn for MemoryTxn<'_> {
    fn insert_task(&mut self, draft: &TaskDraft) -> StoreResult<Task> {
        if !self.state.task_types.contains(&draft.type_id()) {
            return Err(TaskStoreError::InvalidReference(format!(
                "task type {}",
                draft.type_id()
            )));
        }
        let task = Task::from(draft.clone());
        self.state.tasks.insert(task.id(), task.clone());
        Ok(task)
    }

    fn fetch_task(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    fn update_status(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        status: TaskStatus,
    ) -> StoreResult<Option<Task>> {
        let Some(task) = self.state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if task.version() != expected {
            return Ok(None);
        }
        task.advance(status);
        Ok(Some(task.clone()))
    }

    fn append_event(&mut self, event: &TaskEvent) -> StoreResult<()> {
        self.state.events.push(event.clone());
        Ok(())
    }

    fn open_session(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        opened_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let already_open = self
            .state
            .sessions
            .iter()
            .any(|session| session.user_id == user_id && session.task_id == task_id && session.is_open());
        if !already_open {
            self.state
                .sessions
                .push(WorkSession::open(user_id, task_id, opened_at));
        }
        Ok(())
    }

    fn matching_rules(
        &mut self,
        project_id: ProjectId,
        source_type: TaskTypeId,
        trigger: TriggerEvent,
    ) -> StoreResult<Vec<RuleMatch>> {
        let workflows = &self.state.workflows;
        let mut matches: Vec<RuleMatch> = self
            .state
            .rules
            .iter()
            .filter(|(rule, _)| {
                workflows
                    .get(&rule.workflow_id)
                    .is_some_and(|workflow| workflow.project_id == project_id)
                    && rule.applies_to(source_type, trigger)
            })
            .map(|(rule, templates)| RuleMatch {
                rule: rule.clone(),
                templates: templates.clone(),
            })
            .collect();
        matches.sort_by_key(|matched| matched.rule.id);
        Ok(matches)
    }

    fn claim_execution(
        &mut self,
        rule_id: RuleId,
        source_task_id: TaskId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let already_fired = self
            .state
            .executions
            .iter()
            .any(|receipt| receipt.rule_id == rule_id && receipt.source_task_id == source_task_id);
        if already_fired {
            return Ok(false);
        }
        self.state.executions.push(RuleExecution {
            rule_id,
            source_task_id,
            executed_at,
        });
        Ok(true)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
    {
        let mut guard = self.lock().map_err(E::from)?;
        let mut scratch = guard.clone();
        let mut txn = MemoryTxn {
            state: &mut scratch,
        };
        let value = work(&mut txn)?;
        *guard = scratch;
        Ok(value)
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let state = self.lock()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, project_id: ProjectId, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let state = self.lock()?;
        let needle = query.text.as_ref().map(|text| text.to_lowercase());
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.project_id() == project_id)
            .filter(|task| {
                query
                    .status
                    .is_none_or(|status| task.status().kind() == status)
            })
            .filter(|task| query.type_id.is_none_or(|type_id| task.type_id() == type_id))
            .filter(|task| {
                needle.as_ref().is_none_or(|fragment| {
                    task.title().to_lowercase().contains(fragment)
                        || task
                            .description()
                            .is_some_and(|description| description.to_lowercase().contains(fragment))
                })
            })
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(tasks)
    }

    async fn task_events(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>> {
        let state = self.lock()?;
        Ok(state
            .events
            .iter()
            .filter(|event| event.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn execution_receipts(&self, source_task_id: TaskId) -> StoreResult<Vec<RuleExecution>> {
        let state = self.lock()?;
        Ok(state
            .executions
            .iter()
            .filter(|receipt| receipt.source_task_id == source_task_id)
            .copied()
            .collect())
    }

    async fn find_open_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> StoreResult<Option<WorkSession>> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .iter()
            .find(|session| {
                session.user_id == user_id && session.task_id == task_id && session.is_open()
            })
            .cloned())
    }

    async fn work_sessions(&self, task_id: TaskId) -> StoreResult<Vec<WorkSession>> {
        let state = self.lock()?;
        Ok(state
            .sessions
            .iter()
            .filter(|session| session.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn close_work_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
        reason: SessionCloseReason,
        closed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let Some(session) = state.sessions.iter_mut().find(|session| {
            session.user_id == user_id && session.task_id == task_id && session.is_open()
        }) else {
            return Ok(false);
        };
        session.closed_at = Some(closed_at);
        session.close_reason = Some(reason);
        Ok(true)
    }
}
