//! Shared harness for in-memory integration tests.

use std::sync::Arc;

use crewboard::automation::domain::{Rule, TaskTemplate, TriggerEvent, Workflow};
use crewboard::task::{
    adapters::memory::{InMemoryTaskStore, StaticCapabilityResolver},
    domain::{Actor, OrgId, ProjectId, Task, TaskId, TaskTypeId, UserId},
    ports::TaskStore,
    services::{CreateTaskRequest, TaskLifecycleService},
};
use mockable::DefaultClock;

/// Service type under test.
pub type BoardService =
    TaskLifecycleService<InMemoryTaskStore, DefaultClock, StaticCapabilityResolver>;

/// Asserts a slice holds exactly one task and returns it.
///
/// # Errors
///
/// Returns an error when the slice is empty or holds more than one task.
pub fn single_task(tasks: &[Task]) -> Result<&Task, eyre::Report> {
    eyre::ensure!(
        tasks.len() == 1,
        "expected exactly one task, found {}",
        tasks.len()
    );
    tasks
        .first()
        .ok_or_else(|| eyre::eyre!("expected at least one task"))
}

/// One project board with a bug and a review task type seeded.
pub struct Board {
    /// Store, for seeding and direct state assertions.
    pub store: Arc<InMemoryTaskStore>,
    /// Service under test.
    pub service: BoardService,
    /// Default acting user.
    pub actor: Actor,
    /// Project every helper operates in.
    pub project_id: ProjectId,
    /// Seeded "Bug" task type.
    pub bug_type: TaskTypeId,
    /// Seeded "Review" task type.
    pub review_type: TaskTypeId,
}

impl Board {
    /// Creates a board with an empty capability directory.
    pub fn new() -> Self {
        Self::with_resolver(StaticCapabilityResolver::new())
    }

    /// Creates a board backed by the given capability resolver.
    pub fn with_resolver(resolver: StaticCapabilityResolver) -> Self {
        let store = Arc::new(InMemoryTaskStore::new());
        let bug_type = TaskTypeId::new();
        let review_type = TaskTypeId::new();
        store.seed_task_type(bug_type).expect("seed bug type");
        store.seed_task_type(review_type).expect("seed review type");

        let service = TaskLifecycleService::new(
            Arc::clone(&store),
            Arc::new(DefaultClock),
            Arc::new(resolver),
        );
        Self {
            store,
            service,
            actor: Actor::new(OrgId::new(), UserId::new()),
            project_id: ProjectId::new(),
            bug_type,
            review_type,
        }
    }

    /// Builds a second service over the same store and project, backed by
    /// a different capability directory.
    pub fn service_with_resolver(&self, resolver: StaticCapabilityResolver) -> BoardService {
        TaskLifecycleService::new(
            Arc::clone(&self.store),
            Arc::new(DefaultClock),
            Arc::new(resolver),
        )
    }

    /// Seeds a workflow in this board's project holding the given rule.
    pub fn seed_rule_in_project(
        &self,
        project_id: ProjectId,
        rule_builder: impl FnOnce(&Workflow) -> Rule,
        templates: Vec<TaskTemplate>,
    ) -> Rule {
        let workflow = Workflow::new(project_id, "Automation");
        self.store
            .seed_workflow(workflow.clone())
            .expect("seed workflow");
        let rule = rule_builder(&workflow);
        self.store
            .seed_rule(rule.clone(), templates)
            .expect("seed rule");
        rule
    }

    /// Seeds an active completion rule on the bug type with the given
    /// templates, scoped to this board's project.
    pub fn completion_rule_on_bugs(&self, templates: Vec<TaskTemplate>) -> Rule {
        self.seed_rule_in_project(
            self.project_id,
            |workflow| {
                Rule::new(workflow.id, TriggerEvent::Completed).with_source_type(self.bug_type)
            },
            templates,
        )
    }

    /// Creates an available task of the given type through the service.
    pub async fn create_task_of(&self, type_id: TaskTypeId, title: &str) -> Task {
        let request = CreateTaskRequest::new(self.project_id, type_id, title, 3);
        self.service
            .create_task(self.actor, request)
            .await
            .expect("task creation should succeed")
    }

    /// Creates an available bug task through the service.
    pub async fn create_bug(&self, title: &str) -> Task {
        self.create_task_of(self.bug_type, title).await
    }

    /// Claims a task at its current version.
    pub async fn claim(&self, task: &Task) -> Task {
        self.service
            .claim_task(self.actor, task.id(), task.version())
            .await
            .expect("claim should succeed")
    }

    /// Completes a task at its current version.
    pub async fn complete(&self, task: &Task) -> Task {
        self.service
            .complete_task(self.actor, task.id(), task.version())
            .await
            .expect("complete should succeed")
    }

    /// Returns every task in the project except the given source task.
    pub async fn tasks_other_than(&self, source_id: TaskId) -> Vec<Task> {
        self.store
            .list_tasks(self.project_id, &crewboard::task::domain::TaskQuery::new())
            .await
            .expect("listing should succeed")
            .into_iter()
            .filter(|task| task.id() != source_id)
            .collect()
    }
}
