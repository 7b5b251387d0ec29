//! Diesel schema for task lifecycle and automation persistence.

diesel::table! {
    /// Board tasks with lifecycle status and optimistic version.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task type; foreign key into the admin-owned type catalogue.
        type_id -> Uuid,
        /// Task title.
        #[max_length = 255]
        title -> Varchar,
        /// Optional long description.
        description -> Nullable<Text>,
        /// Priority, 1 to 5.
        priority -> SmallInt,
        /// Lifecycle status discriminant.
        #[max_length = 50]
        status -> Varchar,
        /// Whether a claimed task is actively worked.
        is_ongoing -> Bool,
        /// Optimistic concurrency version, starting at 1.
        version -> Int8,
        /// Optional card membership.
        card_id -> Nullable<Uuid>,
        /// Creating user.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only lifecycle audit events.
    task_events (id) {
        /// Event identifier.
        id -> Uuid,
        /// Organization scope.
        org_id -> Uuid,
        /// Project scope.
        project_id -> Uuid,
        /// Task the event belongs to.
        task_id -> Uuid,
        /// User who performed the operation.
        actor_id -> Uuid,
        /// Event kind discriminant.
        #[max_length = 50]
        kind -> Varchar,
        /// When the event was recorded.
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Work session timers, one open row at most per user/task pair.
    work_sessions (id) {
        /// Session identifier.
        id -> Uuid,
        /// User the timer belongs to.
        user_id -> Uuid,
        /// Task being worked.
        task_id -> Uuid,
        /// When active work started.
        opened_at -> Timestamptz,
        /// When the session ended, if it has.
        closed_at -> Nullable<Timestamptz>,
        /// Why the session ended, if it has.
        #[max_length = 50]
        close_reason -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Project-scoped rule containers.
    workflows (id) {
        /// Workflow identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Human-readable name.
        #[max_length = 255]
        name -> Varchar,
    }
}

diesel::table! {
    /// Automation rules.
    rules (id) {
        /// Rule identifier.
        id -> Uuid,
        /// Owning workflow.
        workflow_id -> Uuid,
        /// Source task type filter; null matches any type.
        source_type_id -> Nullable<Uuid>,
        /// Lifecycle trigger discriminant.
        #[max_length = 50]
        trigger_event -> Varchar,
        /// Whether the rule participates in matching.
        active -> Bool,
    }
}

diesel::table! {
    /// Task templates derived tasks are materialised from.
    rule_templates (id) {
        /// Template identifier.
        id -> Uuid,
        /// Title pattern, possibly embedding placeholders.
        title_template -> Text,
        /// Type assigned to the derived task.
        target_type_id -> Uuid,
    }
}

diesel::table! {
    /// Many-to-many attachment of templates to rules.
    rule_template_links (rule_id, template_id) {
        /// Attached rule.
        rule_id -> Uuid,
        /// Attached template.
        template_id -> Uuid,
    }
}

diesel::table! {
    /// Execution receipts, unique per rule/source-task pair.
    rule_executions (rule_id, source_task_id) {
        /// Rule that fired.
        rule_id -> Uuid,
        /// Task whose completion triggered the rule.
        source_task_id -> Uuid,
        /// When the rule fired.
        executed_at -> Timestamptz,
    }
}

diesel::joinable!(rules -> workflows (workflow_id));
diesel::joinable!(rule_template_links -> rules (rule_id));
diesel::joinable!(rule_template_links -> rule_templates (template_id));

diesel::allow_tables_to_appear_in_same_query!(rules, workflows);
diesel::allow_tables_to_appear_in_same_query!(rule_template_links, rule_templates);
