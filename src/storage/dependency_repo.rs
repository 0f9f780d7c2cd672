//! Dependency Repository
//!
//! Persistence of dependency edges between tasks and steps.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use taskmate_core::{Dependency, DependencyCondition, NewDependency};

use super::database::{parsed_column, time_column, to_sql_time};
use crate::utils::error::AppResult;

const DEPENDENCY_COLUMNS: &str = "id, predecessor_task_id, predecessor_step_id, \
     successor_task_id, successor_step_id, dependency_condition, action, created_at";

pub struct DependencyRepo<'c> {
    conn: &'c Connection,
}

impl<'c> DependencyRepo<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert one edge verbatim and return its id
    pub fn insert(&self, edge: &NewDependency, now: DateTime<Utc>) -> AppResult<i64> {
        self.conn.execute(
            "INSERT INTO task_dependencies (predecessor_task_id, predecessor_step_id,
                successor_task_id, successor_step_id, dependency_condition, action, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                edge.predecessor_task_id,
                edge.predecessor_step_id,
                edge.successor_task_id,
                edge.successor_step_id,
                edge.condition.as_str(),
                edge.action.as_str(),
                to_sql_time(&now),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Edges fired by the completion of a task (`step_id = None`) or a step.
    ///
    /// Task completion matches `task_done` edges without a predecessor step;
    /// step completion matches `step_done` edges on exactly that step.
    pub fn find_triggered(&self, task_id: i64, step_id: Option<i64>) -> AppResult<Vec<Dependency>> {
        match step_id {
            Some(step_id) => self.query_edges(
                "WHERE predecessor_task_id = ?1 AND predecessor_step_id = ?2
                   AND dependency_condition = ?3",
                params![task_id, step_id, DependencyCondition::StepDone.as_str()],
            ),
            None => self.query_edges(
                "WHERE predecessor_task_id = ?1 AND predecessor_step_id IS NULL
                   AND dependency_condition = ?2",
                params![task_id, DependencyCondition::TaskDone.as_str()],
            ),
        }
    }

    /// Edges where the task is predecessor or successor
    pub fn list_for_task(&self, task_id: i64) -> AppResult<Vec<Dependency>> {
        self.query_edges(
            "WHERE predecessor_task_id = ?1 OR successor_task_id = ?1",
            [task_id],
        )
    }

    fn query_edges<P: rusqlite::Params>(&self, filter: &str, params: P) -> AppResult<Vec<Dependency>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM task_dependencies {} ORDER BY id",
            DEPENDENCY_COLUMNS, filter
        ))?;
        let rows = stmt.query_map(params, row_to_dependency)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn row_to_dependency(row: &rusqlite::Row) -> rusqlite::Result<Dependency> {
    Ok(Dependency {
        id: row.get(0)?,
        predecessor_task_id: row.get(1)?,
        predecessor_step_id: row.get(2)?,
        successor_task_id: row.get(3)?,
        successor_step_id: row.get(4)?,
        condition: parsed_column(row, 5)?,
        action: parsed_column(row, 6)?,
        created_at: time_column(row, 7)?,
    })
}
