//! Rule executor: derives follow-up tasks when a source task completes.
//!
//! The executor never opens its own transaction. It runs against the
//! [`StoreTxn`] of the lifecycle transition that triggered it, so the
//! derived tasks, their audit events, and the execution receipts commit or
//! roll back together with the status change itself.

use crate::automation::domain::{RuleMatch, TaskTemplate, TriggerEvent};
use crate::task::domain::{Actor, Task, TaskDomainError, TaskDraft, TaskEvent, TaskEventKind};
use crate::task::ports::{StoreTxn, TaskStoreError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while executing automation rules.
#[derive(Debug, Error)]
pub enum RuleExecutionError {
    /// A derived task draft failed domain validation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// A storage operation failed, including dangling template target
    /// types surfacing as invalid references.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Runs the completion-triggered rules for a just-completed source task and
/// returns the tasks they derived.
///
/// For each rule matching `(project, source type, completed)` the receipt
/// is claimed first; a rule whose receipt already exists is skipped
/// wholesale, which is what makes retried triggers idempotent. Each
/// attached template then yields one derived task in the source's project,
/// created by the completing user, inheriting the source's priority and
/// card membership (including no membership).
///
/// # Errors
///
/// Returns [`RuleExecutionError`] on any draft or storage failure. Errors
/// propagate to the transition transaction and roll back the entire
/// completion; a broken automation rule must not half-succeed silently.
pub fn run_completion_rules(
    txn: &mut dyn StoreTxn,
    actor: Actor,
    source: &Task,
    now: DateTime<Utc>,
) -> Result<Vec<Task>, RuleExecutionError> {
    let matches = txn.matching_rules(source.project_id(), source.type_id(), TriggerEvent::Completed)?;

    let mut derived = Vec::new();
    for RuleMatch { rule, templates } in matches {
        if !txn.claim_execution(rule.id, source.id(), now)? {
            // Receipt already present: this rule has fired for this task.
            continue;
        }
        for template in &templates {
            let task = insert_derived_task(txn, template, actor, source, now)?;
            derived.push(task);
        }
    }
    Ok(derived)
}

/// Materialises one template into a derived task plus its created event.
fn insert_derived_task(
    txn: &mut dyn StoreTxn,
    template: &TaskTemplate,
    actor: Actor,
    source: &Task,
    now: DateTime<Utc>,
) -> Result<Task, RuleExecutionError> {
    let title = template.rendered_title(source);
    let mut draft = TaskDraft::new(
        source.project_id(),
        template.target_type_id,
        title,
        source.priority(),
        actor.user_id,
        now,
    )?;
    if let Some(card_id) = source.card_id() {
        draft = draft.with_card(card_id);
    }

    let task = txn.insert_task(&draft)?;
    txn.append_event(&TaskEvent::record(
        actor,
        task.project_id(),
        task.id(),
        TaskEventKind::Created,
        now,
    ))?;
    Ok(task)
}
