//! Dependency Propagation Integration Tests

use chrono::Utc;
use taskmate::models::session::ChatRole;
use taskmate::services::commands::CommandEngine;
use taskmate::services::dependency::{DependencyEngine, PropagationReport};
use taskmate::storage::{Database, SessionRepo, TaskRepo};
use taskmate::AppError;
use taskmate_core::{
    DependencyAction, DependencyCondition, MutationCommand, NewDependency, StepFields,
    StepStatus, TaskStatus, UpdateStepCommand,
};
use tracing::Span;

use crate::support::{add_edge, database, load_task, seed_task, set_step_status};

fn fire(db: &Database, task_id: i64, step_id: Option<i64>) -> PropagationReport {
    let engine = DependencyEngine::new(Span::none());
    db.transaction(|tx| engine.on_completion(tx, task_id, step_id, Utc::now()))
        .unwrap()
}

fn set_task_status(db: &Database, task_id: i64, status: TaskStatus) {
    let conn = db.get_connection().unwrap();
    TaskRepo::new(&conn)
        .set_task_status(task_id, status, Utc::now())
        .unwrap();
}

fn edge(
    predecessor: (i64, Option<i64>),
    successor: (i64, Option<i64>),
    condition: DependencyCondition,
    action: DependencyAction,
) -> NewDependency {
    NewDependency {
        predecessor_task_id: predecessor.0,
        predecessor_step_id: predecessor.1,
        successor_task_id: successor.0,
        successor_step_id: successor.1,
        condition,
        action,
    }
}

#[test]
fn test_scenario_c_step_done_unlocks_locked_step() {
    let db = database();
    let first = seed_task(&db, 1, "Collect receipts", &["scan", "sort"]);
    let second = seed_task(&db, 1, "File taxes", &["fill form"]);
    let (pred_step, succ_step) = (first.steps[0].id, second.steps[0].id);
    set_step_status(&db, succ_step, StepStatus::Locked);
    let edge_id = add_edge(
        &db,
        edge(
            (first.id, Some(pred_step)),
            (second.id, Some(succ_step)),
            DependencyCondition::StepDone,
            DependencyAction::UnlockStep,
        ),
    );

    let report = fire(&db, first.id, Some(pred_step));
    assert_eq!(report.fired, vec![edge_id]);
    assert_eq!(report.unlocked_steps, vec![succ_step]);
    assert_eq!(load_task(&db, second.id).steps[0].status, StepStatus::Todo);
}

#[test]
fn test_unlock_preserves_manual_override() {
    let db = database();
    let first = seed_task(&db, 1, "A", &["a1"]);
    let second = seed_task(&db, 1, "B", &["b1"]);
    set_step_status(&db, second.steps[0].id, StepStatus::Blocked);
    add_edge(
        &db,
        edge(
            (first.id, Some(first.steps[0].id)),
            (second.id, Some(second.steps[0].id)),
            DependencyCondition::StepDone,
            DependencyAction::UnlockStep,
        ),
    );

    let report = fire(&db, first.id, Some(first.steps[0].id));
    assert_eq!(report.fired.len(), 1);
    assert!(report.unlocked_steps.is_empty());
    assert_eq!(load_task(&db, second.id).steps[0].status, StepStatus::Blocked);
}

#[test]
fn test_unlock_twice_is_idempotent() {
    let db = database();
    let first = seed_task(&db, 1, "A", &["a1"]);
    let second = seed_task(&db, 1, "B", &["b1"]);
    set_step_status(&db, second.steps[0].id, StepStatus::Locked);
    add_edge(
        &db,
        edge(
            (first.id, Some(first.steps[0].id)),
            (second.id, Some(second.steps[0].id)),
            DependencyCondition::StepDone,
            DependencyAction::UnlockStep,
        ),
    );

    let once = fire(&db, first.id, Some(first.steps[0].id));
    let after_once = load_task(&db, second.id);
    let twice = fire(&db, first.id, Some(first.steps[0].id));
    let after_twice = load_task(&db, second.id);

    assert_eq!(once.unlocked_steps.len(), 1);
    assert!(twice.unlocked_steps.is_empty());
    assert_eq!(after_once.steps[0].status, after_twice.steps[0].status);
    assert_eq!(after_once.steps[0].updated_at, after_twice.steps[0].updated_at);
}

#[test]
fn test_task_done_edges_ignore_step_events() {
    let db = database();
    let first = seed_task(&db, 1, "A", &["a1"]);
    let second = seed_task(&db, 1, "B", &[]);
    set_task_status(&db, second.id, TaskStatus::InProgress);
    add_edge(
        &db,
        edge(
            (first.id, None),
            (second.id, None),
            DependencyCondition::TaskDone,
            DependencyAction::SetTaskTodo,
        ),
    );

    assert!(fire(&db, first.id, Some(first.steps[0].id)).fired.is_empty());
    assert_eq!(load_task(&db, second.id).status, TaskStatus::InProgress);

    let report = fire(&db, first.id, None);
    assert_eq!(report.reset_tasks, vec![second.id]);
    assert_eq!(load_task(&db, second.id).status, TaskStatus::Todo);
}

#[test]
fn test_set_task_todo_leaves_done_task() {
    let db = database();
    let first = seed_task(&db, 1, "A", &[]);
    let second = seed_task(&db, 1, "B", &[]);
    set_task_status(&db, second.id, TaskStatus::Done);
    add_edge(
        &db,
        edge(
            (first.id, None),
            (second.id, None),
            DependencyCondition::TaskDone,
            DependencyAction::SetTaskTodo,
        ),
    );

    let report = fire(&db, first.id, None);
    assert!(report.reset_tasks.is_empty());
    let second = load_task(&db, second.id);
    assert_eq!(second.status, TaskStatus::Done);
    assert!(second.completed_at.is_some());
}

#[test]
fn test_propagation_is_one_hop() {
    let db = database();
    let a = seed_task(&db, 1, "A", &[]);
    let b = seed_task(&db, 1, "B", &[]);
    let c = seed_task(&db, 1, "C", &[]);
    set_task_status(&db, b.id, TaskStatus::InProgress);
    set_task_status(&db, c.id, TaskStatus::InProgress);
    for (pred, succ) in [(a.id, b.id), (b.id, c.id)] {
        add_edge(
            &db,
            edge(
                (pred, None),
                (succ, None),
                DependencyCondition::TaskDone,
                DependencyAction::SetTaskTodo,
            ),
        );
    }

    let report = fire(&db, a.id, None);
    assert_eq!(report.fired.len(), 1);
    assert_eq!(load_task(&db, b.id).status, TaskStatus::Todo);
    assert_eq!(load_task(&db, c.id).status, TaskStatus::InProgress);
}

#[test]
fn test_notify_only_posts_to_successor_session() {
    let db = database();
    let first = seed_task(&db, 1, "Book venue", &["call venue"]);
    let second = seed_task(&db, 1, "Send invitations", &[]);
    add_edge(
        &db,
        edge(
            (first.id, Some(first.steps[0].id)),
            (second.id, None),
            DependencyCondition::StepDone,
            DependencyAction::NotifyOnly,
        ),
    );

    let report = fire(&db, first.id, Some(first.steps[0].id));
    assert_eq!(report.notices.len(), 1);

    let conn = db.get_connection().unwrap();
    let sessions = SessionRepo::new(&conn);
    let session = sessions.find_task_session(second.id).unwrap().unwrap();
    let messages = sessions.list_recent(session.id, 10).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(
        messages[0].content,
        "System notice: step \"call venue\" is done, which triggered this notification for task \"Send invitations\"."
    );
}

#[test]
fn test_derived_task_completion_fires_task_edges() {
    let db = database();
    let first = seed_task(&db, 1, "A", &["only step"]);
    let second = seed_task(&db, 1, "B", &["b1"]);
    set_step_status(&db, second.steps[0].id, StepStatus::Locked);
    add_edge(
        &db,
        edge(
            (first.id, None),
            (second.id, Some(second.steps[0].id)),
            DependencyCondition::TaskDone,
            DependencyAction::UnlockStep,
        ),
    );

    let engine = CommandEngine::new(Span::none(), DependencyEngine::new(Span::none()));
    let command = MutationCommand::UpdateStep(UpdateStepCommand {
        task_id: first.id,
        step_id: first.steps[0].id,
        fields: StepFields {
            status: Some(StepStatus::Done),
            ..Default::default()
        },
    });
    let report = db
        .transaction(|tx| engine.apply(tx, 1, &[command], Utc::now()))
        .unwrap();

    assert_eq!(report.propagation.unlocked_steps, vec![second.steps[0].id]);
    assert_eq!(load_task(&db, first.id).status, TaskStatus::Done);
    assert_eq!(load_task(&db, second.id).steps[0].status, StepStatus::Todo);
}

#[test]
fn test_failed_propagation_rolls_back_completion() {
    let db = database();
    let first = seed_task(&db, 1, "Book venue", &["call venue", "sign contract"]);
    let second = seed_task(&db, 1, "Send invitations", &[]);
    add_edge(
        &db,
        edge(
            (first.id, Some(first.steps[0].id)),
            (second.id, None),
            DependencyCondition::StepDone,
            DependencyAction::NotifyOnly,
        ),
    );
    db.get_connection()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_messages BEFORE INSERT ON messages
             BEGIN SELECT RAISE(ABORT, 'messages are read-only'); END;",
        )
        .unwrap();

    let engine = CommandEngine::new(Span::none(), DependencyEngine::new(Span::none()));
    let command = MutationCommand::UpdateStep(UpdateStepCommand {
        task_id: first.id,
        step_id: first.steps[0].id,
        fields: StepFields {
            status: Some(StepStatus::Done),
            ..Default::default()
        },
    });
    let result = db.transaction(|tx| engine.apply(tx, 1, &[command], Utc::now()));

    assert!(matches!(result, Err(AppError::Sqlite(_))));
    let first = load_task(&db, first.id);
    assert_eq!(first.steps[0].status, StepStatus::Todo);
    assert!(first.steps[0].completed_at.is_none());
    assert_eq!(first.status, TaskStatus::Todo);

    let conn = db.get_connection().unwrap();
    assert!(SessionRepo::new(&conn)
        .find_task_session(second.id)
        .unwrap()
        .is_none());
}
