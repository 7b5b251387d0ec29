//! `PostgreSQL` task store implementation.
//!
//! Synchronous Diesel operations are offloaded through
//! [`tokio::task::spawn_blocking`] so they never block the async executor,
//! and [`TaskStore::with_transaction`] maps the port's transaction contract
//! directly onto `connection.transaction`: the closure's error aborts the
//! database transaction, rolling back everything the transition wrote.

use super::{
    models::{
        NewRuleExecutionRow, NewTaskEventRow, NewTaskRow, NewWorkSessionRow, RuleExecutionRow,
        RuleRow, TaskEventRow, TaskRow, TemplateRow, WorkSessionRow,
    },
    schema::{
        rule_executions, rule_template_links, rule_templates, rules, task_events, tasks,
        work_sessions, workflows,
    },
};
use crate::automation::domain::{
    Rule, RuleExecution, RuleId, RuleMatch, TaskTemplate, TemplateId, TriggerEvent, WorkflowId,
};
use crate::task::{
    domain::{
        CardId, EventId, OrgId, Priority, ProjectId, SessionCloseReason, SessionId, Task,
        TaskDraft, TaskEvent, TaskEventKind, TaskId, TaskQuery, TaskRecord, TaskStatus,
        TaskTypeId, TaskVersion, UserId, WorkSession,
    },
    ports::{StoreResult, StoreTxn, TaskStore, TaskStoreError},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by the task store.
pub type BoardPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: BoardPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: BoardPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::storage)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::storage)?
    }
}

/// Carrier distinguishing closure errors from database errors inside a
/// Diesel transaction, which requires `From<diesel::result::Error>`.
enum TxnAbort<E> {
    App(E),
    Db(DieselError),
}

impl<E> From<DieselError> for TxnAbort<E> {
    fn from(err: DieselError) -> Self {
        Self::Db(err)
    }
}

struct PgStoreTxn<'a> {
    connection: &'a mut PgConnection,
}

impl StoreTxn for PgStoreTxn<'_> {
    fn insert_task(&mut self, draft: &TaskDraft) -> StoreResult<Task> {
        let row = draft_to_row(draft);
        diesel::insert_into(tasks::table)
            .values(&row)
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                    TaskStoreError::InvalidReference(info.message().to_owned())
                }
                other => TaskStoreError::storage(other),
            })?;
        Ok(Task::from(draft.clone()))
    }

    fn fetch_task(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        let row = tasks::table
            .filter(tasks::id.eq(id.into_inner()))
            .select(TaskRow::as_select())
            .first::<TaskRow>(self.connection)
            .optional()
            .map_err(TaskStoreError::storage)?;
        row.map(row_to_task).transpose()
    }

    fn update_status(
        &mut self,
        id: TaskId,
        expected: TaskVersion,
        status: TaskStatus,
    ) -> StoreResult<Option<Task>> {
        let (status_column, is_ongoing) = status.columns();
        let row = diesel::update(
            tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .filter(tasks::version.eq(expected.value())),
        )
        .set((
            tasks::status.eq(status_column),
            tasks::is_ongoing.eq(is_ongoing),
            tasks::version.eq(expected.next().value()),
        ))
        .returning(TaskRow::as_returning())
        .get_result::<TaskRow>(self.connection)
        .optional()
        .map_err(TaskStoreError::storage)?;
        row.map(row_to_task).transpose()
    }

    fn append_event(&mut self, event: &TaskEvent) -> StoreResult<()> {
        let row = event_to_row(event);
        diesel::insert_into(task_events::table)
            .values(&row)
            .execute(self.connection)
            .map_err(TaskStoreError::storage)?;
        Ok(())
    }

    fn open_session(
        &mut self,
        user_id: UserId,
        task_id: TaskId,
        opened_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let already_open: bool = diesel::select(diesel::dsl::exists(
            work_sessions::table
                .filter(work_sessions::user_id.eq(user_id.into_inner()))
                .filter(work_sessions::task_id.eq(task_id.into_inner()))
                .filter(work_sessions::closed_at.is_null()),
        ))
        .get_result(self.connection)
        .map_err(TaskStoreError::storage)?;
        if already_open {
            return Ok(());
        }

        let row = NewWorkSessionRow {
            id: SessionId::new().into_inner(),
            user_id: user_id.into_inner(),
            task_id: task_id.into_inner(),
            opened_at,
        };
        diesel::insert_into(work_sessions::table)
            .values(&row)
            .execute(self.connection)
            .map_err(TaskStoreError::storage)?;
        Ok(())
    }

    fn matching_rules(
        &mut self,
        project_id: ProjectId,
        source_type: TaskTypeId,
        trigger: TriggerEvent,
    ) -> StoreResult<Vec<RuleMatch>> {
        let rule_rows: Vec<RuleRow> = rules::table
            .inner_join(workflows::table)
            .filter(workflows::project_id.eq(project_id.into_inner()))
            .filter(rules::active.eq(true))
            .filter(rules::trigger_event.eq(trigger.as_str()))
            .filter(
                rules::source_type_id
                    .is_null()
                    .or(rules::source_type_id.eq(Some(source_type.into_inner()))),
            )
            .order(rules::id.asc())
            .select(RuleRow::as_select())
            .load(self.connection)
            .map_err(TaskStoreError::storage)?;

        let rule_ids: Vec<uuid::Uuid> = rule_rows.iter().map(|row| row.id).collect();
        let template_rows: Vec<(uuid::Uuid, TemplateRow)> = rule_template_links::table
            .inner_join(rule_templates::table)
            .filter(rule_template_links::rule_id.eq_any(&rule_ids))
            .order((rule_template_links::rule_id.asc(), rule_templates::id.asc()))
            .select((rule_template_links::rule_id, TemplateRow::as_select()))
            .load(self.connection)
            .map_err(TaskStoreError::storage)?;

        let mut templates_by_rule: HashMap<uuid::Uuid, Vec<TaskTemplate>> = HashMap::new();
        for (rule_id, template_row) in template_rows {
            templates_by_rule
                .entry(rule_id)
                .or_default()
                .push(template_row_to_domain(template_row));
        }

        rule_rows
            .into_iter()
            .map(|row| {
                let templates = templates_by_rule.remove(&row.id).unwrap_or_default();
                Ok(RuleMatch {
                    rule: rule_row_to_domain(row)?,
                    templates,
                })
            })
            .collect()
    }

    fn claim_execution(
        &mut self,
        rule_id: RuleId,
        source_task_id: TaskId,
        executed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let row = NewRuleExecutionRow {
            rule_id: rule_id.into_inner(),
            source_task_id: source_task_id.into_inner(),
            executed_at,
        };
        let inserted = diesel::insert_into(rule_executions::table)
            .values(&row)
            .on_conflict((rule_executions::rule_id, rule_executions::source_task_id))
            .do_nothing()
            .execute(self.connection)
            .map_err(TaskStoreError::storage)?;
        Ok(inserted > 0)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn with_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTxn) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<TaskStoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(TaskStoreError::storage(err)))?;
            let outcome = connection.transaction::<T, TxnAbort<E>, _>(|inner| {
                let mut txn = PgStoreTxn { connection: inner };
                work(&mut txn).map_err(TxnAbort::App)
            });
            outcome.map_err(|abort| match abort {
                TxnAbort::App(err) => err,
                TxnAbort::Db(err) => E::from(TaskStoreError::storage(err)),
            })
        })
        .await
        .map_err(|err| E::from(TaskStoreError::storage(err)))?
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskStoreError::storage)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_tasks(&self, project_id: ProjectId, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let filters = query.clone();
        self.run_blocking(move |connection| {
            let mut statement = tasks::table
                .filter(tasks::project_id.eq(project_id.into_inner()))
                .select(TaskRow::as_select())
                .into_boxed();
            if let Some(status) = filters.status {
                statement = statement.filter(tasks::status.eq(status.as_str()));
            }
            if let Some(type_id) = filters.type_id {
                statement = statement.filter(tasks::type_id.eq(type_id.into_inner()));
            }
            if let Some(text) = &filters.text {
                let pattern = format!("%{text}%");
                statement = statement.filter(
                    tasks::title
                        .ilike(pattern.clone())
                        .or(tasks::description.assume_not_null().ilike(pattern)),
                );
            }

            let rows: Vec<TaskRow> = statement
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .load(connection)
                .map_err(TaskStoreError::storage)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn task_events(&self, task_id: TaskId) -> StoreResult<Vec<TaskEvent>> {
        self.run_blocking(move |connection| {
            let rows: Vec<TaskEventRow> = task_events::table
                .filter(task_events::task_id.eq(task_id.into_inner()))
                .order((task_events::recorded_at.asc(), task_events::id.asc()))
                .select(TaskEventRow::as_select())
                .load(connection)
                .map_err(TaskStoreError::storage)?;
            rows.into_iter().map(row_to_event).collect()
        })
        .await
    }

    async fn execution_receipts(&self, source_task_id: TaskId) -> StoreResult<Vec<RuleExecution>> {
        self.run_blocking(move |connection| {
            let rows: Vec<RuleExecutionRow> = rule_executions::table
                .filter(rule_executions::source_task_id.eq(source_task_id.into_inner()))
                .order(rule_executions::executed_at.asc())
                .select(RuleExecutionRow::as_select())
                .load(connection)
                .map_err(TaskStoreError::storage)?;
            Ok(rows.into_iter().map(row_to_receipt).collect())
        })
        .await
    }

    async fn find_open_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
    ) -> StoreResult<Option<WorkSession>> {
        self.run_blocking(move |connection| {
            let row = work_sessions::table
                .filter(work_sessions::user_id.eq(user_id.into_inner()))
                .filter(work_sessions::task_id.eq(task_id.into_inner()))
                .filter(work_sessions::closed_at.is_null())
                .select(WorkSessionRow::as_select())
                .first::<WorkSessionRow>(connection)
                .optional()
                .map_err(TaskStoreError::storage)?;
            row.map(row_to_session).transpose()
        })
        .await
    }

    async fn work_sessions(&self, task_id: TaskId) -> StoreResult<Vec<WorkSession>> {
        self.run_blocking(move |connection| {
            let rows: Vec<WorkSessionRow> = work_sessions::table
                .filter(work_sessions::task_id.eq(task_id.into_inner()))
                .order(work_sessions::opened_at.asc())
                .select(WorkSessionRow::as_select())
                .load(connection)
                .map_err(TaskStoreError::storage)?;
            rows.into_iter().map(row_to_session).collect()
        })
        .await
    }

    async fn close_work_session(
        &self,
        user_id: UserId,
        task_id: TaskId,
        reason: SessionCloseReason,
        closed_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.run_blocking(move |connection| {
            let affected = diesel::update(
                work_sessions::table
                    .filter(work_sessions::user_id.eq(user_id.into_inner()))
                    .filter(work_sessions::task_id.eq(task_id.into_inner()))
                    .filter(work_sessions::closed_at.is_null()),
            )
            .set((
                work_sessions::closed_at.eq(Some(closed_at)),
                work_sessions::close_reason.eq(Some(reason.as_str())),
            ))
            .execute(connection)
            .map_err(TaskStoreError::storage)?;
            Ok(affected > 0)
        })
        .await
    }
}

fn draft_to_row(draft: &TaskDraft) -> NewTaskRow {
    let (status, is_ongoing) = TaskStatus::Available.columns();
    NewTaskRow {
        id: draft.id().into_inner(),
        project_id: draft.project_id().into_inner(),
        type_id: draft.type_id().into_inner(),
        title: draft.title().to_owned(),
        description: draft.description().map(ToOwned::to_owned),
        priority: i16::from(draft.priority().value()),
        status: status.to_owned(),
        is_ongoing,
        version: TaskVersion::INITIAL.value(),
        card_id: draft.card_id().map(CardId::into_inner),
        created_by: draft.created_by().into_inner(),
        created_at: draft.created_at(),
    }
}

fn row_to_task(row: TaskRow) -> StoreResult<Task> {
    let status =
        TaskStatus::from_columns(&row.status, row.is_ongoing).map_err(TaskStoreError::storage)?;
    let priority_value = u8::try_from(row.priority).map_err(TaskStoreError::storage)?;
    let priority = Priority::new(priority_value).map_err(TaskStoreError::storage)?;

    Ok(Task::from_record(TaskRecord {
        id: TaskId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        type_id: TaskTypeId::from_uuid(row.type_id),
        title: row.title,
        description: row.description,
        priority,
        status,
        version: TaskVersion::new(row.version),
        card_id: row.card_id.map(CardId::from_uuid),
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
    }))
}

fn event_to_row(event: &TaskEvent) -> NewTaskEventRow {
    NewTaskEventRow {
        id: event.id.into_inner(),
        org_id: event.org_id.into_inner(),
        project_id: event.project_id.into_inner(),
        task_id: event.task_id.into_inner(),
        actor_id: event.actor_id.into_inner(),
        kind: event.kind.as_str().to_owned(),
        recorded_at: event.recorded_at,
    }
}

fn row_to_event(row: TaskEventRow) -> StoreResult<TaskEvent> {
    let kind = TaskEventKind::try_from(row.kind.as_str()).map_err(TaskStoreError::storage)?;
    Ok(TaskEvent {
        id: EventId::from_uuid(row.id),
        org_id: OrgId::from_uuid(row.org_id),
        project_id: ProjectId::from_uuid(row.project_id),
        task_id: TaskId::from_uuid(row.task_id),
        actor_id: UserId::from_uuid(row.actor_id),
        kind,
        recorded_at: row.recorded_at,
    })
}

fn row_to_session(row: WorkSessionRow) -> StoreResult<WorkSession> {
    let close_reason = row
        .close_reason
        .as_deref()
        .map(SessionCloseReason::try_from)
        .transpose()
        .map_err(TaskStoreError::storage)?;
    Ok(WorkSession {
        id: SessionId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        task_id: TaskId::from_uuid(row.task_id),
        opened_at: row.opened_at,
        closed_at: row.closed_at,
        close_reason,
    })
}

fn rule_row_to_domain(row: RuleRow) -> StoreResult<Rule> {
    let trigger =
        TriggerEvent::try_from(row.trigger_event.as_str()).map_err(TaskStoreError::storage)?;
    Ok(Rule {
        id: RuleId::from_uuid(row.id),
        workflow_id: WorkflowId::from_uuid(row.workflow_id),
        source_type_id: row.source_type_id.map(TaskTypeId::from_uuid),
        trigger,
        active: row.active,
    })
}

fn template_row_to_domain(row: TemplateRow) -> TaskTemplate {
    TaskTemplate {
        id: TemplateId::from_uuid(row.id),
        title_template: row.title_template,
        target_type_id: TaskTypeId::from_uuid(row.target_type_id),
    }
}

fn row_to_receipt(row: RuleExecutionRow) -> RuleExecution {
    RuleExecution {
        rule_id: RuleId::from_uuid(row.rule_id),
        source_task_id: TaskId::from_uuid(row.source_task_id),
        executed_at: row.executed_at,
    }
}
