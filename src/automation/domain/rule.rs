//! Workflows, rules, and trigger matching.

use super::{ParseTriggerEventError, RuleId, TaskTemplate, WorkflowId};
use crate::task::domain::{ProjectId, TaskTypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle event a rule can watch for.
///
/// The engine currently fires automation on completion only; the other
/// variants exist so persisted rules for future triggers parse cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// A task was claimed.
    Claimed,
    /// A task was released back to the board.
    Released,
    /// A task was completed.
    Completed,
}

impl TriggerEvent {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::Released => "released",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TriggerEvent {
    type Error = ParseTriggerEventError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "claimed" => Ok(Self::Claimed),
            "released" => Ok(Self::Released),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTriggerEventError(value.to_owned())),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named container of rules scoped to one project.
///
/// Workflow membership is what scopes a rule: the matcher only considers
/// rules whose workflow belongs to the triggering task's project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier.
    pub id: WorkflowId,
    /// Project the workflow belongs to.
    pub project_id: ProjectId,
    /// Human-readable name.
    pub name: String,
}

impl Workflow {
    /// Creates a workflow for a project.
    #[must_use]
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::new(),
            project_id,
            name: name.into(),
        }
    }
}

/// One automation rule: "when tasks of type X reach event Y, derive tasks
/// from my templates".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier.
    pub id: RuleId,
    /// Workflow the rule belongs to.
    pub workflow_id: WorkflowId,
    /// Source task type filter; `None` matches any type.
    pub source_type_id: Option<TaskTypeId>,
    /// Lifecycle event the rule watches for.
    pub trigger: TriggerEvent,
    /// Whether the rule participates in matching.
    pub active: bool,
}

impl Rule {
    /// Creates an active rule with no source type filter.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, trigger: TriggerEvent) -> Self {
        Self {
            id: RuleId::new(),
            workflow_id,
            source_type_id: None,
            trigger,
            active: true,
        }
    }

    /// Restricts the rule to one source task type.
    #[must_use]
    pub const fn with_source_type(mut self, type_id: TaskTypeId) -> Self {
        self.source_type_id = Some(type_id);
        self
    }

    /// Returns the rule with matching switched off.
    #[must_use]
    pub const fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns whether this rule fires for a source task type and trigger.
    ///
    /// Project scoping is not this rule's job; the matcher restricts the
    /// candidate set to the triggering project's workflows first.
    #[must_use]
    pub fn applies_to(&self, source_type: TaskTypeId, trigger: TriggerEvent) -> bool {
        self.active
            && self.trigger == trigger
            && self.source_type_id.is_none_or(|filter| filter == source_type)
    }
}

/// A matched rule together with its attached templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// The rule that matched.
    pub rule: Rule,
    /// Templates attached to the rule, possibly empty.
    pub templates: Vec<TaskTemplate>,
}
