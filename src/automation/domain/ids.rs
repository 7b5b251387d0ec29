//! Identifier newtypes for the automation domain.

use crate::task::domain::entity_id;

entity_id!(
    /// Unique identifier for a workflow, a project-scoped rule container.
    WorkflowId
);

entity_id!(
    /// Unique identifier for an automation rule.
    RuleId
);

entity_id!(
    /// Unique identifier for a task template.
    TemplateId
);
