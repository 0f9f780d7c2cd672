//! Session Repository
//!
//! Conversation sessions and their messages.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::database::{parsed_column, time_column, to_sql_time};
use crate::models::session::{ChatMessage, ChatRole, Session, SessionKind};
use crate::utils::error::AppResult;

const SESSION_COLUMNS: &str = "id, owner_id, kind, task_id, title, created_at";
const MESSAGE_COLUMNS: &str = "id, session_id, role, content, agent_name, created_at";

pub struct SessionRepo<'c> {
    conn: &'c Connection,
}

impl<'c> SessionRepo<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn create_session(
        &self,
        owner_id: i64,
        kind: SessionKind,
        task_id: Option<i64>,
        title: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        self.conn.execute(
            "INSERT INTO sessions (owner_id, kind, task_id, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![owner_id, kind.as_str(), task_id, title, to_sql_time(&now)],
        )?;
        Ok(Session {
            id: self.conn.last_insert_rowid(),
            owner_id,
            kind,
            task_id,
            title: title.to_string(),
            created_at: now,
        })
    }

    pub fn get_session(&self, session_id: i64) -> AppResult<Option<Session>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
                [session_id],
                row_to_session,
            )
            .optional()?)
    }

    /// Oldest task session bound to `task_id`
    pub fn find_task_session(&self, task_id: i64) -> AppResult<Option<Session>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM sessions WHERE task_id = ?1 AND kind = 'task'
                     ORDER BY id LIMIT 1",
                    SESSION_COLUMNS
                ),
                [task_id],
                row_to_session,
            )
            .optional()?)
    }

    pub fn append_message(
        &self,
        session_id: i64,
        role: ChatRole,
        content: &str,
        agent_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ChatMessage> {
        self.conn.execute(
            "INSERT INTO messages (session_id, role, content, agent_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, role.as_str(), content, agent_name, to_sql_time(&now)],
        )?;
        Ok(ChatMessage {
            id: self.conn.last_insert_rowid(),
            session_id,
            role,
            content: content.to_string(),
            agent_name: agent_name.map(str::to_string),
            created_at: now,
        })
    }

    /// The most recent `limit` messages, oldest first
    pub fn list_recent(&self, session_id: i64, limit: u32) -> AppResult<Vec<ChatMessage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM (
                SELECT {} FROM messages WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id",
            MESSAGE_COLUMNS, MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![session_id, limit], row_to_message)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Append a system message to the task's session, opening one if the
    /// task has none yet
    pub fn append_task_notice(
        &self,
        owner_id: i64,
        task_id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> AppResult<ChatMessage> {
        let session = match self.find_task_session(task_id)? {
            Some(session) => session,
            None => self.create_session(owner_id, SessionKind::Task, Some(task_id), "", now)?,
        };
        self.append_message(session.id, ChatRole::System, content, None, now)
    }
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: parsed_column(row, 2)?,
        task_id: row.get(3)?,
        title: row.get(4)?,
        created_at: time_column(row, 5)?,
    })
}

fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: parsed_column(row, 2)?,
        content: row.get(3)?,
        agent_name: row.get(4)?,
        created_at: time_column(row, 5)?,
    })
}
