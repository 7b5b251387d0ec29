//! Integration tests for rule firing: fan-out, idempotency, scoping,
//! inheritance, and transactional rollback.

use super::helpers::{single_task, Board};
use crewboard::automation::domain::{Rule, TaskTemplate, TriggerEvent};
use crewboard::task::{
    domain::{CardId, ProjectId, TaskStatus, TaskVersion},
    ports::{TaskStore, TaskStoreError},
    services::{CreateTaskRequest, TaskLifecycleError},
};
use rstest::{fixture, rstest};

#[fixture]
fn board() -> Board {
    Board::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_a_bug_derives_a_review_task(board: Board) -> eyre::Result<()> {
    let rule = board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        board.review_type,
    )]);

    let bug = board.create_bug("Login times out").await;
    let claimed = board.claim(&bug).await;
    let completed = board.complete(&claimed).await;

    eyre::ensure!(completed.status() == TaskStatus::Completed);

    let derived = board.tasks_other_than(bug.id()).await;
    let review = single_task(&derived)?;
    eyre::ensure!(review.type_id() == board.review_type);
    eyre::ensure!(review.status() == TaskStatus::Available);
    eyre::ensure!(review.version() == TaskVersion::INITIAL);
    eyre::ensure!(review.created_by() == board.actor.user_id);
    eyre::ensure!(review.priority() == bug.priority());
    eyre::ensure!(review.title().contains(&format!("[Task #{}]", bug.id())));

    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    eyre::ensure!(receipts.len() == 1);
    eyre::ensure!(receipts.first().expect("one receipt").rule_id == rule.id);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_completion_attempt_derives_nothing(board: Board) {
    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        board.review_type,
    )]);

    let bug = board.create_bug("One-shot automation").await;
    let claimed = board.claim(&bug).await;
    let completed = board.complete(&claimed).await;

    let retry_current = board
        .service
        .complete_task(board.actor, bug.id(), completed.version())
        .await;
    let retry_stale = board
        .service
        .complete_task(board.actor, bug.id(), claimed.version())
        .await;

    assert!(matches!(retry_current, Err(TaskLifecycleError::Domain(_))));
    assert!(matches!(retry_stale, Err(TaskLifecycleError::Domain(_))));

    assert_eq!(board.tasks_other_than(bug.id()).await.len(), 1);
    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    assert_eq!(receipts.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_with_two_templates_derives_two_tasks(board: Board) {
    board.completion_rule_on_bugs(vec![
        TaskTemplate::new("Review {{father}}", board.review_type),
        TaskTemplate::new("Regression-test {{father}}", board.review_type),
    ]);

    let bug = board.create_bug("Fan-out source").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    let derived = board.tasks_other_than(bug.id()).await;
    assert_eq!(derived.len(), 2);
    for task in &derived {
        assert!(task.title().contains(&format!("[Task #{}]", bug.id())));
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inactive_rule_never_fires(board: Board) {
    board.seed_rule_in_project(
        board.project_id,
        |workflow| {
            Rule::new(workflow.id, TriggerEvent::Completed)
                .with_source_type(board.bug_type)
                .deactivated()
        },
        vec![TaskTemplate::new("Review {{father}}", board.review_type)],
    );

    let bug = board.create_bug("Watched by a dead rule").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    assert!(board.tasks_other_than(bug.id()).await.is_empty());
    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    assert!(receipts.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_without_source_filter_matches_any_type(board: Board) {
    board.seed_rule_in_project(
        board.project_id,
        |workflow| Rule::new(workflow.id, TriggerEvent::Completed),
        vec![TaskTemplate::new("Follow up on {{father}}", board.review_type)],
    );

    let review = board
        .create_task_of(board.review_type, "Typeless trigger source")
        .await;
    let claimed = board.claim(&review).await;
    board.complete(&claimed).await;

    assert_eq!(board.tasks_other_than(review.id()).await.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_on_another_type_does_not_fire(board: Board) {
    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        board.review_type,
    )]);

    let review = board
        .create_task_of(board.review_type, "Not a bug")
        .await;
    let claimed = board.claim(&review).await;
    board.complete(&claimed).await;

    assert!(board.tasks_other_than(review.id()).await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_scoped_to_another_project_does_not_fire(board: Board) {
    // Same source type, but the workflow belongs to a different project.
    board.seed_rule_in_project(
        ProjectId::new(),
        |workflow| {
            Rule::new(workflow.id, TriggerEvent::Completed).with_source_type(board.bug_type)
        },
        vec![TaskTemplate::new("Review {{father}}", board.review_type)],
    );

    let bug = board.create_bug("Foreign workflow watches my type").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    assert!(board.tasks_other_than(bug.id()).await.is_empty());
    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    assert!(receipts.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn derived_task_inherits_the_source_card(board: Board) {
    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        board.review_type,
    )]);

    let card_id = CardId::new();
    let request = CreateTaskRequest::new(board.project_id, board.bug_type, "Carded bug", 3)
        .with_card(card_id);
    let bug = board
        .service
        .create_task(board.actor, request)
        .await
        .expect("task creation should succeed");
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    let derived = board.tasks_other_than(bug.id()).await;
    assert_eq!(derived.first().expect("one derived task").card_id(), Some(card_id));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn derived_task_inherits_the_absence_of_a_card(board: Board) {
    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        board.review_type,
    )]);

    let bug = board.create_bug("Cardless bug").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    let derived = board.tasks_other_than(bug.id()).await;
    assert_eq!(derived.first().expect("one derived task").card_id(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dangling_template_target_rolls_back_the_completion(board: Board) {
    use crewboard::task::domain::TaskTypeId;

    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Review {{father}}",
        TaskTypeId::new(), // never seeded
    )]);

    let bug = board.create_bug("Automation points nowhere").await;
    let claimed = board.claim(&bug).await;

    let result = board
        .service
        .complete_task(board.actor, bug.id(), claimed.version())
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Store(
            TaskStoreError::InvalidReference(_)
        ))
    ));

    // The whole completion rolled back: state, version, events, receipts.
    let stored = board
        .store
        .find_task(bug.id())
        .await
        .expect("lookup should succeed")
        .expect("task should exist");
    assert_eq!(stored.status(), claimed.status());
    assert_eq!(stored.version(), claimed.version());
    assert!(board.tasks_other_than(bug.id()).await.is_empty());
    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    assert!(receipts.is_empty());
    let events = board
        .store
        .task_events(bug.id())
        .await
        .expect("event lookup should succeed");
    assert_eq!(events.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rule_with_no_templates_records_its_receipt_only(board: Board) {
    let rule = board.completion_rule_on_bugs(Vec::new());

    let bug = board.create_bug("Receipt-only rule").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    assert!(board.tasks_other_than(bug.id()).await.is_empty());
    let receipts = board
        .store
        .execution_receipts(bug.id())
        .await
        .expect("receipt lookup should succeed");
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts.first().expect("one receipt").rule_id, rule.id);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_template_placeholders_survive_into_the_title(board: Board) {
    board.completion_rule_on_bugs(vec![TaskTemplate::new(
        "Escalate {{father}} to {{severity}}",
        board.review_type,
    )]);

    let bug = board.create_bug("Odd template").await;
    let claimed = board.claim(&bug).await;
    board.complete(&claimed).await;

    let derived = board.tasks_other_than(bug.id()).await;
    let title = derived.first().expect("one derived task").title().to_owned();
    assert!(title.contains(&format!("[Task #{}]", bug.id())));
    assert!(title.contains("{{severity}}"));
}
