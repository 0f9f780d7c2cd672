//! Task Repository
//!
//! Task and step persistence over a borrowed connection, so the same code
//! runs inside or outside a transaction.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use taskmate_core::{
    CreateTaskCommand, NewStep, Step, StepFields, StepStatus, Task, TaskFields, TaskStatus,
};

use super::database::{parsed_column, time_column, time_column_opt, to_sql_time, to_sql_time_opt};
use crate::utils::error::{AppError, AppResult};

const TASK_COLUMNS: &str = "id, owner_id, title, description, status, priority, due_at, \
     is_focus_today, created_at, updated_at, completed_at";

const STEP_COLUMNS: &str = "id, task_id, order_index, title, detail, status, blocking_reason, \
     estimate_minutes, planned_start, planned_end, created_at, updated_at, completed_at";

/// Task and step queries
pub struct TaskRepo<'c> {
    conn: &'c Connection,
}

impl<'c> TaskRepo<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Load a task with its steps ordered by `order_index`
    pub fn get_task(&self, task_id: i64) -> AppResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                [task_id],
                row_to_task,
            )
            .optional()?;

        match task {
            Some(mut task) => {
                task.steps = self.list_steps(task_id)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Load a task the caller owns.
    ///
    /// Missing tasks are `NotFound`; tasks of another owner are `Forbidden`.
    pub fn get_owned_task(&self, owner_id: i64, task_id: i64) -> AppResult<Task> {
        let task = self
            .get_task(task_id)?
            .ok_or_else(|| AppError::not_found(format!("task {}", task_id)))?;
        if task.owner_id != owner_id {
            return Err(AppError::forbidden(format!(
                "task {} does not belong to owner {}",
                task_id, owner_id
            )));
        }
        Ok(task)
    }

    /// Owner of a task, if the task exists
    pub fn owner_of(&self, task_id: i64) -> AppResult<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT owner_id FROM tasks WHERE id = ?1", [task_id], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Tasks of an owner that are neither done nor cancelled
    pub fn list_open_tasks(&self, owner_id: i64) -> AppResult<Vec<Task>> {
        self.query_tasks(
            &format!(
                "SELECT {} FROM tasks
                 WHERE owner_id = ?1 AND status IN ('todo', 'in_progress')
                 ORDER BY is_focus_today DESC, due_at IS NULL, due_at, id",
                TASK_COLUMNS
            ),
            owner_id,
        )
    }

    fn query_tasks(&self, sql: &str, owner_id: i64) -> AppResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([owner_id], row_to_task)?;
        let mut tasks = rows.collect::<Result<Vec<_>, _>>()?;
        for task in &mut tasks {
            task.steps = self.list_steps(task.id)?;
        }
        Ok(tasks)
    }

    pub fn get_step(&self, step_id: i64) -> AppResult<Option<Step>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM task_steps WHERE id = ?1", STEP_COLUMNS),
                [step_id],
                row_to_step,
            )
            .optional()?)
    }

    pub fn list_steps(&self, task_id: i64) -> AppResult<Vec<Step>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM task_steps WHERE task_id = ?1 ORDER BY order_index, id",
            STEP_COLUMNS
        ))?;
        let rows = stmt.query_map([task_id], row_to_step)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a new `todo` task with its steps numbered from 1 in list order
    pub fn insert_task_with_steps(
        &self,
        owner_id: i64,
        command: &CreateTaskCommand,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        let now_text = to_sql_time(&now);
        self.conn.execute(
            "INSERT INTO tasks (owner_id, title, description, status, priority, due_at,
                                is_focus_today, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'todo', ?4, ?5, 0, ?6, ?6)",
            params![
                owner_id,
                command.title,
                command.description,
                command.priority.as_str(),
                to_sql_time_opt(command.due_at.as_ref()),
                now_text,
            ],
        )?;
        let task_id = self.conn.last_insert_rowid();

        for (idx, step) in command.steps.iter().enumerate() {
            self.insert_step(task_id, step, idx as i64 + 1, StepStatus::Todo, now)?;
        }

        Ok(task_id)
    }

    /// Insert one step and return its id
    pub fn insert_step(
        &self,
        task_id: i64,
        step: &NewStep,
        order_index: i64,
        status: StepStatus,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        self.conn.execute(
            "INSERT INTO task_steps (task_id, order_index, title, detail, status,
                                     estimate_minutes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                task_id,
                order_index,
                step.title,
                step.detail,
                status.as_str(),
                step.estimate_minutes,
                to_sql_time(&now),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Order index following the task's last step (1 for a task without steps)
    pub fn next_order_index(&self, task_id: i64) -> AppResult<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(order_index) FROM task_steps WHERE task_id = ?1",
            [task_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    /// Write the provided task fields; absent fields stay untouched.
    ///
    /// Moving to `done` stamps `completed_at` (first completion wins); moving
    /// to any other status clears it.
    pub fn update_task_fields(
        &self,
        task_id: i64,
        fields: &TaskFields,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let now_text = to_sql_time(&now);
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &fields.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(description) = &fields.description {
            sets.push("description = ?");
            values.push(Value::Text(description.clone()));
        }
        if let Some(priority) = fields.priority {
            sets.push("priority = ?");
            values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(due_at) = &fields.due_at {
            sets.push("due_at = ?");
            values.push(Value::Text(to_sql_time(due_at)));
        }
        if let Some(status) = fields.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
            if status == TaskStatus::Done {
                sets.push("completed_at = COALESCE(completed_at, ?)");
                values.push(Value::Text(now_text.clone()));
            } else {
                sets.push("completed_at = NULL");
            }
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(now_text));
        values.push(Value::Integer(task_id));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Write the provided step fields; absent fields stay untouched.
    ///
    /// Same completed-time rule as tasks. A blocking reason is kept only
    /// while the step is blocked.
    pub fn update_step_fields(
        &self,
        step_id: i64,
        fields: &StepFields,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let now_text = to_sql_time(&now);
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &fields.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(detail) = &fields.detail {
            sets.push("detail = ?");
            values.push(Value::Text(detail.clone()));
        }
        if let Some(estimate) = fields.estimate_minutes {
            sets.push("estimate_minutes = ?");
            values.push(Value::Integer(estimate));
        }
        if let Some(order_index) = fields.order_index {
            sets.push("order_index = ?");
            values.push(Value::Integer(order_index));
        }
        if let Some(start) = &fields.planned_start {
            sets.push("planned_start = ?");
            values.push(Value::Text(to_sql_time(start)));
        }
        if let Some(end) = &fields.planned_end {
            sets.push("planned_end = ?");
            values.push(Value::Text(to_sql_time(end)));
        }

        match fields.status {
            Some(StepStatus::Blocked) => {
                sets.push("status = 'blocked'");
                sets.push("completed_at = NULL");
                if let Some(reason) = &fields.blocking_reason {
                    sets.push("blocking_reason = ?");
                    values.push(Value::Text(reason.clone()));
                }
            }
            Some(status) => {
                sets.push("status = ?");
                values.push(Value::Text(status.as_str().to_string()));
                sets.push("blocking_reason = NULL");
                if status == StepStatus::Done {
                    sets.push("completed_at = COALESCE(completed_at, ?)");
                    values.push(Value::Text(now_text.clone()));
                } else {
                    sets.push("completed_at = NULL");
                }
            }
            None => {
                if let Some(reason) = &fields.blocking_reason {
                    sets.push("blocking_reason = CASE WHEN status = 'blocked' THEN ? ELSE NULL END");
                    values.push(Value::Text(reason.clone()));
                }
            }
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(now_text));
        values.push(Value::Integer(step_id));

        let sql = format!("UPDATE task_steps SET {} WHERE id = ?", sets.join(", "));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Refresh a task's last-modified stamp
    pub fn touch_task(&self, task_id: i64, now: DateTime<Utc>) -> AppResult<()> {
        self.conn.execute(
            "UPDATE tasks SET updated_at = ?1 WHERE id = ?2",
            params![to_sql_time(&now), task_id],
        )?;
        Ok(())
    }

    /// Set a derived task status, keeping the completed-time invariant
    pub fn set_task_status(
        &self,
        task_id: i64,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.update_task_fields(
            task_id,
            &TaskFields {
                status: Some(status),
                ..Default::default()
            },
            now,
        )
    }

    pub fn set_focus_today(&self, task_id: i64, now: DateTime<Utc>) -> AppResult<()> {
        self.conn.execute(
            "UPDATE tasks SET is_focus_today = 1, updated_at = ?1 WHERE id = ?2",
            params![to_sql_time(&now), task_id],
        )?;
        Ok(())
    }

    /// Move a locked step of `task_id` to `todo`; returns whether it moved
    pub fn unlock_step(&self, task_id: i64, step_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let changed = self.conn.execute(
            "UPDATE task_steps SET status = 'todo', updated_at = ?1
             WHERE id = ?2 AND task_id = ?3 AND status = 'locked'",
            params![to_sql_time(&now), step_id, task_id],
        )?;
        Ok(changed > 0)
    }

    /// Move a task to `todo` unless it is done; returns whether it changed
    pub fn reset_task_unless_done(&self, task_id: i64, now: DateTime<Utc>) -> AppResult<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = 'todo', completed_at = NULL, updated_at = ?1
             WHERE id = ?2 AND status != 'done'",
            params![to_sql_time(&now), task_id],
        )?;
        Ok(changed > 0)
    }
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parsed_column(row, 4)?,
        priority: parsed_column(row, 5)?,
        due_at: time_column_opt(row, 6)?,
        is_focus_today: row.get::<_, i64>(7)? != 0,
        created_at: time_column(row, 8)?,
        updated_at: time_column(row, 9)?,
        completed_at: time_column_opt(row, 10)?,
        steps: Vec::new(),
    })
}

fn row_to_step(row: &rusqlite::Row) -> rusqlite::Result<Step> {
    Ok(Step {
        id: row.get(0)?,
        task_id: row.get(1)?,
        order_index: row.get(2)?,
        title: row.get(3)?,
        detail: row.get(4)?,
        status: parsed_column(row, 5)?,
        blocking_reason: row.get(6)?,
        estimate_minutes: row.get(7)?,
        planned_start: time_column_opt(row, 8)?,
        planned_end: time_column_opt(row, 9)?,
        created_at: time_column(row, 10)?,
        updated_at: time_column(row, 11)?,
        completed_at: time_column_opt(row, 12)?,
    })
}
