//! Taskmate Core
//!
//! Domain types shared across the Taskmate workspace. This crate performs no
//! I/O: it only describes the task graph and the commands that mutate it.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `task` - Tasks, steps, dependency edges and their status enums
//! - `time` - Lenient timestamp parsing for model-produced dates
//! - `command` - The `MutationCommand` tagged union

pub mod command;
pub mod error;
pub mod task;
pub mod time;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Task Graph ─────────────────────────────────────────────────────────
pub use task::{
    Dependency, DependencyAction, DependencyCondition, NewDependency, NewStep, Priority, Step,
    StepStatus, Task, TaskStatus,
};

// ── Mutation Commands ──────────────────────────────────────────────────
pub use command::{
    AddDependenciesCommand, AddStepsCommand, CommandKind, CreateTaskCommand,
    MarkFocusTodayCommand, MutationCommand, StepFields, TaskFields, UpdateStepCommand,
    UpdateTaskCommand,
};
