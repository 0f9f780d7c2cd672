//! Task Graph Types
//!
//! Tasks own an ordered list of steps; dependency edges link the completion of
//! a predecessor (task or step) to an action on a successor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Implements `as_str`, `Display` and `FromStr` for a snake_case status enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire/storage representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> CoreResult<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(CoreError::parse(format!(
                        "invalid {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

string_enum!(TaskStatus {
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
    Cancelled => "cancelled",
});

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// Lifecycle state of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Waiting on a dependency edge to fire
    Locked,
    Todo,
    InProgress,
    Done,
    Blocked,
}

string_enum!(StepStatus {
    Locked => "locked",
    Todo => "todo",
    InProgress => "in_progress",
    Done => "done",
    Blocked => "blocked",
});

/// What kind of completion fires an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    TaskDone,
    StepDone,
}

string_enum!(DependencyCondition {
    TaskDone => "task_done",
    StepDone => "step_done",
});

/// What a fired edge does to its successor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyAction {
    UnlockStep,
    SetTaskTodo,
    NotifyOnly,
}

string_enum!(DependencyAction {
    UnlockStep => "unlock_step",
    SetTaskTodo => "set_task_todo",
    NotifyOnly => "notify_only",
});

/// A persisted task together with its ordered steps.
///
/// Invariant: `status == Done` exactly when `completed_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub is_focus_today: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Steps sorted by `order_index`, then id
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Task {
    /// True when the task has at least one step and every step is done.
    pub fn all_steps_done(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status == StepStatus::Done)
    }

    /// Look up one of this task's steps.
    pub fn step(&self, step_id: i64) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

/// A persisted step of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: i64,
    pub task_id: i64,
    /// Smaller runs earlier
    pub order_index: i64,
    pub title: String,
    pub detail: String,
    pub status: StepStatus,
    /// Only meaningful while `status == Blocked`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A step to be inserted under an existing or new task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStep {
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_minutes: Option<i64>,
    /// Advisory only; steps are appended in insertion order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after_step_id: Option<i64>,
}

/// A persisted dependency edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: i64,
    pub predecessor_task_id: i64,
    /// `None` means the whole task is the predecessor
    pub predecessor_step_id: Option<i64>,
    pub successor_task_id: i64,
    pub successor_step_id: Option<i64>,
    pub condition: DependencyCondition,
    pub action: DependencyAction,
    pub created_at: DateTime<Utc>,
}

/// A dependency edge waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDependency {
    pub predecessor_task_id: i64,
    #[serde(default)]
    pub predecessor_step_id: Option<i64>,
    pub successor_task_id: i64,
    #[serde(default)]
    pub successor_step_id: Option<i64>,
    pub condition: DependencyCondition,
    pub action: DependencyAction,
}

impl NewDependency {
    /// Check the structural invariants of an edge.
    ///
    /// `step_done` needs a predecessor step; `unlock_step` needs a successor step.
    pub fn validate(&self) -> CoreResult<()> {
        if self.condition == DependencyCondition::StepDone && self.predecessor_step_id.is_none() {
            return Err(CoreError::validation(
                "condition step_done requires predecessor_step_id",
            ));
        }
        if self.action == DependencyAction::UnlockStep && self.successor_step_id.is_none() {
            return Err(CoreError::validation(
                "action unlock_step requires successor_step_id",
            ));
        }
        Ok(())
    }
}
