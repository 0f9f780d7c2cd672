//! Dependency Engine
//!
//! Fires the dependency edges matched by one completion event. Runs on the
//! caller's connection so its writes share the triggering transaction.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use taskmate_core::{Dependency, DependencyAction};
use tracing::Span;

use crate::storage::{DependencyRepo, SessionRepo, TaskRepo};
use crate::utils::error::AppResult;

/// Effects of one completion event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationReport {
    /// Edges matched by the event
    pub fired: Vec<i64>,
    /// Steps moved from locked to todo
    pub unlocked_steps: Vec<i64>,
    /// Tasks moved back to todo
    pub reset_tasks: Vec<i64>,
    /// System messages posted to successor task sessions
    pub notices: Vec<i64>,
}

impl PropagationReport {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

/// Applies dependency actions for completion events
#[derive(Debug, Clone)]
pub struct DependencyEngine {
    span: Span,
}

impl DependencyEngine {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Handle the completion of a task (`step_id = None`) or one of its steps.
    ///
    /// Effects on successors are not themselves treated as completion
    /// events, so propagation never goes further than one edge.
    pub fn on_completion(
        &self,
        conn: &Connection,
        task_id: i64,
        step_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<PropagationReport> {
        let edges = DependencyRepo::new(conn).find_triggered(task_id, step_id)?;
        let mut report = PropagationReport::default();
        if edges.is_empty() {
            return Ok(report);
        }

        tracing::debug!(
            parent: &self.span,
            task_id,
            step_id,
            edges = edges.len(),
            "firing dependency edges"
        );

        let tasks = TaskRepo::new(conn);
        let predecessor = self.describe_predecessor(&tasks, task_id, step_id)?;

        for edge in &edges {
            report.fired.push(edge.id);
            match edge.action {
                DependencyAction::UnlockStep => {
                    let Some(successor_step) = edge.successor_step_id else {
                        tracing::warn!(
                            parent: &self.span,
                            edge = edge.id,
                            "unlock_step edge without successor step"
                        );
                        continue;
                    };
                    if tasks.unlock_step(edge.successor_task_id, successor_step, now)? {
                        report.unlocked_steps.push(successor_step);
                    }
                }
                DependencyAction::SetTaskTodo => {
                    if tasks.reset_task_unless_done(edge.successor_task_id, now)? {
                        report.reset_tasks.push(edge.successor_task_id);
                    }
                }
                DependencyAction::NotifyOnly => {
                    if let Some(message_id) = self.notify(conn, edge, predecessor.as_deref(), now)? {
                        report.notices.push(message_id);
                    }
                }
            }
        }

        tracing::info!(
            parent: &self.span,
            task_id,
            step_id,
            unlocked = report.unlocked_steps.len(),
            reset = report.reset_tasks.len(),
            notices = report.notices.len(),
            "dependencies propagated"
        );

        Ok(report)
    }

    /// `step "<title>"` or `task "<title>"` for the completed predecessor
    fn describe_predecessor(
        &self,
        tasks: &TaskRepo<'_>,
        task_id: i64,
        step_id: Option<i64>,
    ) -> AppResult<Option<String>> {
        Ok(match step_id {
            Some(step_id) => tasks
                .get_step(step_id)?
                .map(|step| format!("step \"{}\"", step.title)),
            None => tasks
                .get_task(task_id)?
                .map(|task| format!("task \"{}\"", task.title)),
        })
    }

    fn notify(
        &self,
        conn: &Connection,
        edge: &Dependency,
        predecessor: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<i64>> {
        let Some(successor) = TaskRepo::new(conn).get_task(edge.successor_task_id)? else {
            return Ok(None);
        };
        let content = notice_text(predecessor, &successor.title);
        let message = SessionRepo::new(conn).append_task_notice(
            successor.owner_id,
            successor.id,
            &content,
            now,
        )?;
        Ok(Some(message.id))
    }
}

fn notice_text(predecessor: Option<&str>, successor_title: &str) -> String {
    match predecessor {
        Some(predecessor) => format!(
            "System notice: {} is done, which triggered this notification for task \"{}\".",
            predecessor, successor_title
        ),
        None => format!(
            "System notice: a dependency is done, which triggered this notification for task \"{}\".",
            successor_title
        ),
    }
}
