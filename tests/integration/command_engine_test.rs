//! Command Application Engine Integration Tests

use chrono::{TimeZone, Utc};
use taskmate::services::commands::{ApplyReport, CommandEngine};
use taskmate::services::dependency::DependencyEngine;
use taskmate::storage::Database;
use taskmate::{AppError, AppResult};
use taskmate_core::{
    AddDependenciesCommand, AddStepsCommand, DependencyAction, DependencyCondition,
    MarkFocusTodayCommand, MutationCommand, NewDependency, NewStep, Priority, StepFields,
    StepStatus, TaskFields, TaskStatus, UpdateStepCommand, UpdateTaskCommand,
};
use tracing::Span;

use crate::support::{database, load_task, seed_task, set_step_status};

fn engine() -> CommandEngine {
    CommandEngine::new(Span::none(), DependencyEngine::new(Span::none()))
}

fn apply(db: &Database, owner_id: i64, commands: &[MutationCommand]) -> AppResult<ApplyReport> {
    let engine = engine();
    db.transaction(|tx| engine.apply(tx, owner_id, commands, Utc::now()))
}

fn step_status(task_id: i64, step_id: i64, status: StepStatus) -> MutationCommand {
    MutationCommand::UpdateStep(UpdateStepCommand {
        task_id,
        step_id,
        fields: StepFields {
            status: Some(status),
            ..Default::default()
        },
    })
}

fn task_fields(task_id: i64, fields: TaskFields) -> MutationCommand {
    MutationCommand::UpdateTask(UpdateTaskCommand { task_id, fields })
}

#[test]
fn test_scenario_b_last_step_completes_task() {
    let db = database();
    let task = seed_task(&db, 1, "Ship release", &["build", "publish"]);
    set_step_status(&db, task.steps[0].id, StepStatus::Done);

    apply(&db, 1, &[step_status(task.id, task.steps[1].id, StepStatus::Done)]).unwrap();

    let task = load_task(&db, task.id);
    assert_eq!(task.status, TaskStatus::Done);
    assert!(task.completed_at.is_some());
    assert!(task.steps.iter().all(|s| s.completed_at.is_some()));
}

#[test]
fn test_every_step_done_implies_task_done() {
    for step_count in 1..=4 {
        let db = database();
        let titles: Vec<String> = (0..step_count).map(|i| format!("step {}", i)).collect();
        let titles: Vec<&str> = titles.iter().map(String::as_str).collect();
        let task = seed_task(&db, 1, "Many steps", &titles);

        let commands: Vec<MutationCommand> = task
            .steps
            .iter()
            .map(|s| step_status(task.id, s.id, StepStatus::Done))
            .collect();
        apply(&db, 1, &commands).unwrap();

        let task = load_task(&db, task.id);
        assert_eq!(task.status, TaskStatus::Done, "{} steps", step_count);
        assert!(task.completed_at.is_some());
    }
}

#[test]
fn test_partial_progress_promotes_todo_task() {
    let db = database();
    let task = seed_task(&db, 1, "Write report", &["outline", "draft"]);

    apply(&db, 1, &[step_status(task.id, task.steps[0].id, StepStatus::Done)]).unwrap();

    let task = load_task(&db, task.id);
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.completed_at.is_none());
}

#[test]
fn test_sparse_update_round_trips() {
    let db = database();
    let task = seed_task(&db, 1, "Old title", &["one"]);
    let due = Utc.with_ymd_and_hms(2026, 11, 2, 17, 0, 0).unwrap();

    apply(
        &db,
        1,
        &[task_fields(
            task.id,
            TaskFields {
                priority: Some(Priority::High),
                due_at: Some(due),
                ..Default::default()
            },
        )],
    )
    .unwrap();

    let after = load_task(&db, task.id);
    assert_eq!(after.priority, Priority::High);
    assert_eq!(after.due_at, Some(due));
    // untouched fields
    assert_eq!(after.title, task.title);
    assert_eq!(after.description, task.description);
    assert_eq!(after.status, task.status);
    assert_eq!(after.is_focus_today, task.is_focus_today);
    assert_eq!(after.steps, task.steps);
}

#[test]
fn test_leaving_done_clears_completed_time() {
    let db = database();
    let task = seed_task(&db, 1, "Toggle", &[]);

    apply(
        &db,
        1,
        &[task_fields(
            task.id,
            TaskFields {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )],
    )
    .unwrap();
    assert!(load_task(&db, task.id).completed_at.is_some());

    apply(
        &db,
        1,
        &[task_fields(
            task.id,
            TaskFields {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )],
    )
    .unwrap();
    let task = load_task(&db, task.id);
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.completed_at.is_none());
}

#[test]
fn test_failed_command_rolls_back_batch() {
    let db = database();
    let task = seed_task(&db, 1, "Atomic", &["first", "second"]);

    let commands = vec![
        step_status(task.id, task.steps[0].id, StepStatus::Done),
        task_fields(
            task.id,
            TaskFields {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        ),
        // step 999 does not exist
        step_status(task.id, 999, StepStatus::Done),
    ];
    let err = apply(&db, 1, &commands).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let after = load_task(&db, task.id);
    assert_eq!(after.title, "Atomic");
    assert_eq!(after.status, TaskStatus::Todo);
    assert_eq!(after.steps[0].status, StepStatus::Todo);
}

#[test]
fn test_foreign_task_is_forbidden() {
    let db = database();
    let task = seed_task(&db, 2, "Someone else's", &["a"]);

    let err = apply(&db, 1, &[step_status(task.id, task.steps[0].id, StepStatus::Done)])
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(load_task(&db, task.id).steps[0].status, StepStatus::Todo);
}

#[test]
fn test_focus_drops_foreign_ids_only() {
    let db = database();
    let mine = seed_task(&db, 1, "Mine", &[]);
    let theirs = seed_task(&db, 2, "Theirs", &[]);

    let report = apply(
        &db,
        1,
        &[MutationCommand::MarkFocusToday(MarkFocusTodayCommand {
            task_ids: vec![mine.id, theirs.id, 4242],
        })],
    )
    .unwrap();

    assert_eq!(report.dropped_focus_ids, vec![theirs.id, 4242]);
    assert!(load_task(&db, mine.id).is_focus_today);
    assert!(!load_task(&db, theirs.id).is_focus_today);
}

#[test]
fn test_add_steps_appends_in_insertion_order() {
    let db = database();
    let task = seed_task(&db, 1, "Grow", &["one", "two"]);

    let new_step = |title: &str, anchor: Option<i64>| NewStep {
        title: title.to_string(),
        detail: String::new(),
        estimate_minutes: Some(15),
        insert_after_step_id: anchor,
    };
    let report = apply(
        &db,
        1,
        &[MutationCommand::AddSteps(AddStepsCommand {
            task_id: task.id,
            parent_step_id: None,
            // anchors are advisory
            steps: vec![
                new_step("three", Some(task.steps[0].id)),
                new_step("four", None),
            ],
        })],
    )
    .unwrap();
    assert_eq!(report.added_step_ids.len(), 2);

    let task = load_task(&db, task.id);
    let titles: Vec<&str> = task.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["one", "two", "three", "four"]);
    assert_eq!(task.steps[2].status, StepStatus::Todo);
    assert_eq!(task.steps[3].order_index, 4);
}

#[test]
fn test_later_commands_see_earlier_effects() {
    let db = database();
    let task = seed_task(&db, 1, "Chain", &["one"]);

    let report = apply(
        &db,
        1,
        &[
            MutationCommand::AddSteps(AddStepsCommand {
                task_id: task.id,
                parent_step_id: None,
                steps: vec![NewStep {
                    title: "two".to_string(),
                    detail: String::new(),
                    estimate_minutes: None,
                    insert_after_step_id: None,
                }],
            }),
            step_status(task.id, task.steps[0].id, StepStatus::Done),
        ],
    )
    .unwrap();
    assert_eq!(report.applied, 2);

    // the added step keeps the task open
    let task = load_task(&db, task.id);
    assert_eq!(task.status, TaskStatus::InProgress);
}

#[test]
fn test_dependency_step_must_belong_to_task() {
    let db = database();
    let first = seed_task(&db, 1, "First", &["a"]);
    let second = seed_task(&db, 1, "Second", &["b"]);

    let err = apply(
        &db,
        1,
        &[MutationCommand::AddDependencies(AddDependenciesCommand {
            items: vec![NewDependency {
                predecessor_task_id: first.id,
                predecessor_step_id: Some(second.steps[0].id),
                successor_task_id: second.id,
                successor_step_id: None,
                condition: DependencyCondition::StepDone,
                action: DependencyAction::NotifyOnly,
            }],
        })],
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
