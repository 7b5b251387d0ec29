//! Integration tests for state transitions, versioning, events, and
//! work sessions.

use super::helpers::Board;
use chrono::Utc;
use crewboard::task::{
    domain::{
        SessionCloseReason, TaskDomainError, TaskEventKind, TaskId, TaskStatus, TaskVersion,
    },
    ports::{StoreTxn, TaskStore, TaskStoreError},
    services::TaskLifecycleError,
};
use rstest::{fixture, rstest};

#[fixture]
fn board() -> Board {
    Board::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_task_records_created_event(board: Board) {
    let task = board.create_bug("Importer drops rows").await;

    let events = board
        .store
        .task_events(task.id())
        .await
        .expect("event lookup should succeed");

    assert_eq!(events.len(), 1);
    let event = events.first().expect("one event");
    assert_eq!(event.kind, TaskEventKind::Created);
    assert_eq!(event.org_id, board.actor.org_id);
    assert_eq!(event.project_id, board.project_id);
    assert_eq!(event.actor_id, board.actor.user_id);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn version_tracks_accepted_transitions(board: Board) {
    let task = board.create_bug("Version counter").await;
    assert_eq!(task.version(), TaskVersion::INITIAL);

    let claimed = board.claim(&task).await;
    let started = board
        .service
        .start_task(board.actor, task.id(), claimed.version())
        .await
        .expect("start should succeed");
    let released = board
        .service
        .release_task(board.actor, task.id(), started.version())
        .await
        .expect("release should succeed");
    let reclaimed = board.claim(&released).await;
    let completed = board.complete(&reclaimed).await;

    // Five accepted transitions on top of the initial version.
    assert_eq!(completed.version(), TaskVersion::new(6));
    assert_eq!(completed.status(), TaskStatus::Completed);

    let kinds: Vec<TaskEventKind> = board
        .store
        .task_events(task.id())
        .await
        .expect("event lookup should succeed")
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TaskEventKind::Created,
            TaskEventKind::Claimed,
            TaskEventKind::Started,
            TaskEventKind::Released,
            TaskEventKind::Claimed,
            TaskEventKind::Completed,
        ]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_version_rejection_leaves_state_unchanged(board: Board) {
    let task = board.create_bug("Contended task").await;
    let claimed = board.claim(&task).await;

    let result = board
        .service
        .complete_task(board.actor, task.id(), TaskVersion::INITIAL)
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Store(
            TaskStoreError::NotFoundOrConflict(_)
        ))
    ));

    let stored = board
        .store
        .find_task(task.id())
        .await
        .expect("lookup should succeed")
        .expect("task should exist");
    assert_eq!(stored.status(), claimed.status());
    assert_eq!(stored.version(), claimed.version());

    let events = board
        .store
        .task_events(task.id())
        .await
        .expect("event lookup should succeed");
    assert_eq!(events.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_task_is_reported_as_conflict(board: Board) {
    let result = board
        .service
        .claim_task(board.actor, TaskId::new(), TaskVersion::INITIAL)
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Store(
            TaskStoreError::NotFoundOrConflict(_)
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_an_available_task_is_an_invalid_transition(board: Board) {
    let task = board.create_bug("Never claimed").await;

    let result = board
        .service
        .complete_task(board.actor, task.id(), task.version())
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::InvalidTransition { .. }
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_a_completed_task_is_an_invalid_transition(board: Board) {
    let task = board.create_bug("Completed twice").await;
    let claimed = board.claim(&task).await;
    let completed = board.complete(&claimed).await;

    // Even presenting the genuinely current version, the terminal state
    // wins: this is an invalid transition, not a version conflict.
    let result = board
        .service
        .complete_task(board.actor, task.id(), completed.version())
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::InvalidTransition { .. }
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_opens_a_session_and_release_closes_it(board: Board) {
    let task = board.create_bug("Timed work").await;
    let claimed = board.claim(&task).await;
    let started = board
        .service
        .start_task(board.actor, task.id(), claimed.version())
        .await
        .expect("start should succeed");

    let open = board
        .store
        .find_open_session(board.actor.user_id, task.id())
        .await
        .expect("session lookup should succeed");
    assert!(open.is_some());

    board
        .service
        .release_task(board.actor, task.id(), started.version())
        .await
        .expect("release should succeed");

    let still_open = board
        .store
        .find_open_session(board.actor.user_id, task.id())
        .await
        .expect("session lookup should succeed");
    assert!(still_open.is_none());

    let sessions = board
        .store
        .work_sessions(task.id())
        .await
        .expect("session lookup should succeed");
    assert_eq!(sessions.len(), 1);
    let session = sessions.first().expect("one session");
    assert_eq!(session.close_reason, Some(SessionCloseReason::Released));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn complete_closes_the_session_with_completed_reason(board: Board) {
    let task = board.create_bug("Timed to completion").await;
    let claimed = board.claim(&task).await;
    let started = board
        .service
        .start_task(board.actor, task.id(), claimed.version())
        .await
        .expect("start should succeed");

    board
        .service
        .complete_task(board.actor, task.id(), started.version())
        .await
        .expect("complete should succeed");

    let sessions = board
        .store
        .work_sessions(task.id())
        .await
        .expect("session lookup should succeed");
    let session = sessions.first().expect("one session");
    assert!(!session.is_open());
    assert_eq!(session.close_reason, Some(SessionCloseReason::Completed));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn release_without_started_work_closes_nothing(board: Board) {
    let task = board.create_bug("Taken but never started").await;
    let claimed = board.claim(&task).await;

    board
        .service
        .release_task(board.actor, task.id(), claimed.version())
        .await
        .expect("release should succeed");

    let sessions = board
        .store
        .work_sessions(task.id())
        .await
        .expect("session lookup should succeed");
    assert!(sessions.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn opening_an_already_open_session_is_a_noop(board: Board) {
    let task = board.create_bug("Sticky timer").await;
    let user_id = board.actor.user_id;
    let task_id = task.id();
    let now = Utc::now();

    board
        .store
        .with_transaction(
            move |txn: &mut dyn StoreTxn| -> Result<(), TaskStoreError> {
                txn.open_session(user_id, task_id, now)?;
                txn.open_session(user_id, task_id, now)?;
                Ok(())
            },
        )
        .await
        .expect("transaction should succeed");

    let sessions = board
        .store
        .work_sessions(task.id())
        .await
        .expect("session lookup should succeed");
    assert_eq!(sessions.len(), 1);
}
