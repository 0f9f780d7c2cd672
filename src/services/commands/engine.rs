//! Command Engine
//!
//! Applies mutation commands in order on one connection. The caller owns the
//! transaction: any error returned here must roll the whole batch back.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use taskmate_core::{
    AddDependenciesCommand, AddStepsCommand, CreateTaskCommand, MarkFocusTodayCommand,
    MutationCommand, StepStatus, TaskStatus, UpdateStepCommand, UpdateTaskCommand,
};
use tracing::Span;

use crate::services::dependency::{DependencyEngine, PropagationReport};
use crate::storage::{DependencyRepo, TaskRepo};
use crate::utils::error::{AppError, AppResult};

/// Outcome of one applied batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    /// Number of commands applied
    pub applied: usize,
    /// Tasks created by `create_task` commands, in order
    pub created_task_ids: Vec<i64>,
    /// Steps inserted by `add_steps` commands, in order
    pub added_step_ids: Vec<i64>,
    /// Edges inserted by `add_dependencies` commands, in order
    pub added_dependency_ids: Vec<i64>,
    /// Focus ids skipped because the caller does not own them
    pub dropped_focus_ids: Vec<i64>,
    /// Dependency effects triggered by completions in this batch
    pub propagation: PropagationReport,
}

impl ApplyReport {
    fn absorb(&mut self, report: PropagationReport) {
        self.propagation.fired.extend(report.fired);
        self.propagation.unlocked_steps.extend(report.unlocked_steps);
        self.propagation.reset_tasks.extend(report.reset_tasks);
        self.propagation.notices.extend(report.notices);
    }
}

/// Applies mutation commands with the status cascade rules
#[derive(Debug, Clone)]
pub struct CommandEngine {
    span: Span,
    dependencies: DependencyEngine,
}

impl CommandEngine {
    pub fn new(span: Span, dependencies: DependencyEngine) -> Self {
        Self { span, dependencies }
    }

    /// Apply `commands` in list order on behalf of `owner_id`.
    ///
    /// Later commands observe the effects of earlier ones. The first failure
    /// is returned as-is; the caller rolls back.
    pub fn apply(
        &self,
        conn: &Connection,
        owner_id: i64,
        commands: &[MutationCommand],
        now: DateTime<Utc>,
    ) -> AppResult<ApplyReport> {
        let mut report = ApplyReport::default();

        for (index, command) in commands.iter().enumerate() {
            command.validate()?;
            tracing::debug!(
                parent: &self.span,
                index,
                kind = %command.kind(),
                "applying command"
            );

            match command {
                MutationCommand::UpdateTask(cmd) => {
                    self.update_task(conn, owner_id, cmd, now, &mut report)?
                }
                MutationCommand::UpdateStep(cmd) => {
                    self.update_step(conn, owner_id, cmd, now, &mut report)?
                }
                MutationCommand::AddSteps(cmd) => {
                    self.add_steps(conn, owner_id, cmd, now, &mut report)?
                }
                MutationCommand::AddDependencies(cmd) => {
                    self.add_dependencies(conn, owner_id, cmd, now, &mut report)?
                }
                MutationCommand::MarkFocusToday(cmd) => {
                    self.mark_focus_today(conn, owner_id, cmd, now, &mut report)?
                }
                MutationCommand::CreateTask(cmd) => {
                    self.create_task(conn, owner_id, cmd, now, &mut report)?
                }
            }
            report.applied += 1;
        }

        tracing::info!(
            parent: &self.span,
            applied = report.applied,
            created = report.created_task_ids.len(),
            fired = report.propagation.fired.len(),
            "commands applied"
        );

        Ok(report)
    }

    fn update_task(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &UpdateTaskCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        let before = tasks.get_owned_task(owner_id, cmd.task_id)?;

        tasks.update_task_fields(cmd.task_id, &cmd.fields, now)?;

        if cmd.fields.status == Some(TaskStatus::Done) && before.status != TaskStatus::Done {
            report.absorb(self.dependencies.on_completion(conn, cmd.task_id, None, now)?);
        }
        Ok(())
    }

    fn update_step(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &UpdateStepCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        let task = tasks.get_owned_task(owner_id, cmd.task_id)?;
        let step = task.step(cmd.step_id).ok_or_else(|| {
            AppError::not_found(format!("step {} of task {}", cmd.step_id, cmd.task_id))
        })?;
        let was_done = step.status == StepStatus::Done;

        tasks.update_step_fields(cmd.step_id, &cmd.fields, now)?;
        tasks.touch_task(cmd.task_id, now)?;

        if cmd.fields.status != Some(StepStatus::Done) {
            return Ok(());
        }

        if !was_done {
            report.absorb(
                self.dependencies
                    .on_completion(conn, cmd.task_id, Some(cmd.step_id), now)?,
            );
        }

        self.derive_task_status(conn, cmd.task_id, now, report)
    }

    /// Re-derive a task's status after one of its steps completed
    fn derive_task_status(
        &self,
        conn: &Connection,
        task_id: i64,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        let task = tasks
            .get_task(task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;

        if task.all_steps_done() {
            if task.status != TaskStatus::Done {
                tracing::debug!(parent: &self.span, task_id, "all steps done, completing task");
                tasks.set_task_status(task_id, TaskStatus::Done, now)?;
                report.absorb(self.dependencies.on_completion(conn, task_id, None, now)?);
            }
        } else if task.status == TaskStatus::Todo {
            tasks.set_task_status(task_id, TaskStatus::InProgress, now)?;
        }
        Ok(())
    }

    fn add_steps(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &AddStepsCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        tasks.get_owned_task(owner_id, cmd.task_id)?;

        if cmd.parent_step_id.is_some() || cmd.steps.iter().any(|s| s.insert_after_step_id.is_some()) {
            tracing::debug!(
                parent: &self.span,
                task_id = cmd.task_id,
                parent_step_id = cmd.parent_step_id,
                "insertion anchors ignored, appending in list order"
            );
        }

        let mut order_index = tasks.next_order_index(cmd.task_id)?;
        for step in &cmd.steps {
            let step_id = tasks.insert_step(cmd.task_id, step, order_index, StepStatus::Todo, now)?;
            report.added_step_ids.push(step_id);
            order_index += 1;
        }
        tasks.touch_task(cmd.task_id, now)?;
        Ok(())
    }

    fn add_dependencies(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &AddDependenciesCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        let edges = DependencyRepo::new(conn);

        for item in &cmd.items {
            let predecessor = tasks.get_owned_task(owner_id, item.predecessor_task_id)?;
            let successor = tasks.get_owned_task(owner_id, item.successor_task_id)?;

            if let Some(step_id) = item.predecessor_step_id {
                if predecessor.step(step_id).is_none() {
                    return Err(AppError::validation(format!(
                        "step {} does not belong to task {}",
                        step_id, predecessor.id
                    )));
                }
            }
            if let Some(step_id) = item.successor_step_id {
                if successor.step(step_id).is_none() {
                    return Err(AppError::validation(format!(
                        "step {} does not belong to task {}",
                        step_id, successor.id
                    )));
                }
            }

            report.added_dependency_ids.push(edges.insert(item, now)?);
        }
        Ok(())
    }

    fn mark_focus_today(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &MarkFocusTodayCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let tasks = TaskRepo::new(conn);
        for &task_id in &cmd.task_ids {
            if tasks.owner_of(task_id)? == Some(owner_id) {
                tasks.set_focus_today(task_id, now)?;
            } else {
                tracing::debug!(parent: &self.span, task_id, "focus id not owned, dropped");
                report.dropped_focus_ids.push(task_id);
            }
        }
        Ok(())
    }

    fn create_task(
        &self,
        conn: &Connection,
        owner_id: i64,
        cmd: &CreateTaskCommand,
        now: DateTime<Utc>,
        report: &mut ApplyReport,
    ) -> AppResult<()> {
        let task_id = TaskRepo::new(conn).insert_task_with_steps(owner_id, cmd, now)?;
        report.created_task_ids.push(task_id);
        Ok(())
    }
}
