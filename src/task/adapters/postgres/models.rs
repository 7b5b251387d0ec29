//! Diesel row models for task lifecycle persistence.

use super::schema::{rule_executions, rule_templates, rules, task_events, tasks, work_sessions};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task type.
    pub type_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Priority, 1 to 5.
    pub priority: i16,
    /// Lifecycle status discriminant.
    pub status: String,
    /// Whether a claimed task is actively worked.
    pub is_ongoing: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Optional card membership.
    pub card_id: Option<uuid::Uuid>,
    /// Creating user.
    pub created_by: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning project.
    pub project_id: uuid::Uuid,
    /// Task type.
    pub type_id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Priority, 1 to 5.
    pub priority: i16,
    /// Lifecycle status discriminant.
    pub status: String,
    /// Whether a claimed task is actively worked.
    pub is_ongoing: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Optional card membership.
    pub card_id: Option<uuid::Uuid>,
    /// Creating user.
    pub created_by: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for lifecycle audit events.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskEventRow {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Organization scope.
    pub org_id: uuid::Uuid,
    /// Project scope.
    pub project_id: uuid::Uuid,
    /// Task the event belongs to.
    pub task_id: uuid::Uuid,
    /// User who performed the operation.
    pub actor_id: uuid::Uuid,
    /// Event kind discriminant.
    pub kind: String,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Insert model for lifecycle audit events.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_events)]
pub struct NewTaskEventRow {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Organization scope.
    pub org_id: uuid::Uuid,
    /// Project scope.
    pub project_id: uuid::Uuid,
    /// Task the event belongs to.
    pub task_id: uuid::Uuid,
    /// User who performed the operation.
    pub actor_id: uuid::Uuid,
    /// Event kind discriminant.
    pub kind: String,
    /// When the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Query result row for work sessions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = work_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkSessionRow {
    /// Session identifier.
    pub id: uuid::Uuid,
    /// User the timer belongs to.
    pub user_id: uuid::Uuid,
    /// Task being worked.
    pub task_id: uuid::Uuid,
    /// When active work started.
    pub opened_at: DateTime<Utc>,
    /// When the session ended, if it has.
    pub closed_at: Option<DateTime<Utc>>,
    /// Why the session ended, if it has.
    pub close_reason: Option<String>,
}

/// Insert model for work sessions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = work_sessions)]
pub struct NewWorkSessionRow {
    /// Session identifier.
    pub id: uuid::Uuid,
    /// User the timer belongs to.
    pub user_id: uuid::Uuid,
    /// Task being worked.
    pub task_id: uuid::Uuid,
    /// When active work started.
    pub opened_at: DateTime<Utc>,
}

/// Query result row for automation rules.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RuleRow {
    /// Rule identifier.
    pub id: uuid::Uuid,
    /// Owning workflow.
    pub workflow_id: uuid::Uuid,
    /// Source task type filter; null matches any type.
    pub source_type_id: Option<uuid::Uuid>,
    /// Lifecycle trigger discriminant.
    pub trigger_event: String,
    /// Whether the rule participates in matching.
    pub active: bool,
}

/// Query result row for task templates.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rule_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TemplateRow {
    /// Template identifier.
    pub id: uuid::Uuid,
    /// Title pattern.
    pub title_template: String,
    /// Type assigned to the derived task.
    pub target_type_id: uuid::Uuid,
}

/// Query result row for execution receipts.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = rule_executions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RuleExecutionRow {
    /// Rule that fired.
    pub rule_id: uuid::Uuid,
    /// Task whose completion triggered the rule.
    pub source_task_id: uuid::Uuid,
    /// When the rule fired.
    pub executed_at: DateTime<Utc>,
}

/// Insert model for execution receipts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rule_executions)]
pub struct NewRuleExecutionRow {
    /// Rule that fired.
    pub rule_id: uuid::Uuid,
    /// Task whose completion triggered the rule.
    pub source_task_id: uuid::Uuid,
    /// When the rule fired.
    pub executed_at: DateTime<Utc>,
}
