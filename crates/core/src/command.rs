//! Mutation Commands
//!
//! The tagged union of validated instructions that change the task graph.
//! Sparse updates use `Option` fields; `None` leaves the stored value alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::task::{NewDependency, NewStep, Priority, StepStatus, TaskStatus};
use crate::time;

/// Sparse task field update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        deserialize_with = "time::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<DateTime<Utc>>,
}

impl TaskFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_at.is_none()
    }
}

/// Sparse step field update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
    #[serde(
        default,
        deserialize_with = "time::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub planned_start: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "time::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub planned_end: Option<DateTime<Utc>>,
}

impl StepFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.detail.is_none()
            && self.status.is_none()
            && self.blocking_reason.is_none()
            && self.estimate_minutes.is_none()
            && self.order_index.is_none()
            && self.planned_start.is_none()
            && self.planned_end.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTaskCommand {
    pub task_id: i64,
    pub fields: TaskFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStepCommand {
    pub task_id: i64,
    pub step_id: i64,
    pub fields: StepFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddStepsCommand {
    pub task_id: i64,
    /// Advisory anchor, recorded but not used for ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_step_id: Option<i64>,
    pub steps: Vec<NewStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddDependenciesCommand {
    pub items: Vec<NewDependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkFocusTodayCommand {
    pub task_ids: Vec<i64>,
}

/// A brand-new task with its initial steps, produced by text-to-task parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskCommand {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(
        default,
        deserialize_with = "time::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<NewStep>,
}

/// One typed change to the task graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationCommand {
    UpdateTask(UpdateTaskCommand),
    UpdateStep(UpdateStepCommand),
    AddSteps(AddStepsCommand),
    AddDependencies(AddDependenciesCommand),
    MarkFocusToday(MarkFocusTodayCommand),
    CreateTask(CreateTaskCommand),
}

/// Discriminant of a [`MutationCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    UpdateTask,
    UpdateStep,
    AddSteps,
    AddDependencies,
    MarkFocusToday,
    CreateTask,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::UpdateTask => "update_task",
            CommandKind::UpdateStep => "update_step",
            CommandKind::AddSteps => "add_steps",
            CommandKind::AddDependencies => "add_dependencies",
            CommandKind::MarkFocusToday => "mark_focus_today",
            CommandKind::CreateTask => "create_task",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn check_estimate(estimate: Option<i64>) -> CoreResult<()> {
    match estimate {
        Some(minutes) if minutes < 1 => Err(CoreError::validation(format!(
            "estimate_minutes must be >= 1, got {}",
            minutes
        ))),
        _ => Ok(()),
    }
}

fn check_new_steps(steps: &[NewStep]) -> CoreResult<()> {
    for step in steps {
        if step.title.trim().is_empty() {
            return Err(CoreError::validation("step title cannot be empty"));
        }
        check_estimate(step.estimate_minutes)?;
    }
    Ok(())
}

impl MutationCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            MutationCommand::UpdateTask(_) => CommandKind::UpdateTask,
            MutationCommand::UpdateStep(_) => CommandKind::UpdateStep,
            MutationCommand::AddSteps(_) => CommandKind::AddSteps,
            MutationCommand::AddDependencies(_) => CommandKind::AddDependencies,
            MutationCommand::MarkFocusToday(_) => CommandKind::MarkFocusToday,
            MutationCommand::CreateTask(_) => CommandKind::CreateTask,
        }
    }

    /// Structural validation that needs no storage access.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            MutationCommand::UpdateTask(cmd) => {
                if let Some(title) = &cmd.fields.title {
                    if title.trim().is_empty() {
                        return Err(CoreError::validation("task title cannot be empty"));
                    }
                }
                Ok(())
            }
            MutationCommand::UpdateStep(cmd) => check_estimate(cmd.fields.estimate_minutes),
            MutationCommand::AddSteps(cmd) => check_new_steps(&cmd.steps),
            MutationCommand::AddDependencies(cmd) => {
                cmd.items.iter().try_for_each(NewDependency::validate)
            }
            MutationCommand::MarkFocusToday(_) => Ok(()),
            MutationCommand::CreateTask(cmd) => {
                if cmd.title.trim().is_empty() {
                    return Err(CoreError::validation("task title cannot be empty"));
                }
                check_new_steps(&cmd.steps)
            }
        }
    }
}
