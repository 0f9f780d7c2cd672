//! Shared fixtures for the integration tests.

use std::sync::Arc;

use chrono::Utc;
use taskmate::models::session::{Session, SessionKind};
use taskmate::storage::{Database, DependencyRepo, SessionRepo, TaskRepo};
use taskmate::{AppConfig, OrchestrationService};
use taskmate_core::{
    CreateTaskCommand, NewDependency, NewStep, Priority, StepFields, StepStatus, Task,
};
use taskmate_llm::{LlmResponse, ScriptedProvider, ToolCall};
use tracing::Span;

pub fn database() -> Database {
    Database::new_in_memory().unwrap()
}

/// Insert a task with the given step titles and return it as stored
pub fn seed_task(db: &Database, owner_id: i64, title: &str, steps: &[&str]) -> Task {
    let command = CreateTaskCommand {
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        due_at: None,
        steps: steps
            .iter()
            .map(|s| NewStep {
                title: s.to_string(),
                detail: String::new(),
                estimate_minutes: None,
                insert_after_step_id: None,
            })
            .collect(),
    };
    let conn = db.get_connection().unwrap();
    let repo = TaskRepo::new(&conn);
    let task_id = repo
        .insert_task_with_steps(owner_id, &command, Utc::now())
        .unwrap();
    repo.get_task(task_id).unwrap().unwrap()
}

pub fn load_task(db: &Database, task_id: i64) -> Task {
    let conn = db.get_connection().unwrap();
    TaskRepo::new(&conn).get_task(task_id).unwrap().unwrap()
}

pub fn set_step_status(db: &Database, step_id: i64, status: StepStatus) {
    let conn = db.get_connection().unwrap();
    let fields = StepFields {
        status: Some(status),
        ..Default::default()
    };
    TaskRepo::new(&conn)
        .update_step_fields(step_id, &fields, Utc::now())
        .unwrap();
}

pub fn add_edge(db: &Database, edge: NewDependency) -> i64 {
    let conn = db.get_connection().unwrap();
    DependencyRepo::new(&conn).insert(&edge, Utc::now()).unwrap()
}

pub fn open_session(db: &Database, owner_id: i64, task_id: Option<i64>) -> Session {
    let kind = if task_id.is_some() {
        SessionKind::Task
    } else {
        SessionKind::Global
    };
    let conn = db.get_connection().unwrap();
    SessionRepo::new(&conn)
        .create_session(owner_id, kind, task_id, "test", Utc::now())
        .unwrap()
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

pub fn tool_reply(calls: Vec<ToolCall>) -> LlmResponse {
    LlmResponse::with_tool_calls(None, calls)
}

pub fn scripted(replies: Vec<LlmResponse>) -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::with_replies(replies.into_iter().map(Ok)))
}

pub fn service(db: &Database, provider: Arc<ScriptedProvider>) -> OrchestrationService {
    service_with(db, provider, AppConfig::default())
}

pub fn service_with(
    db: &Database,
    provider: Arc<ScriptedProvider>,
    config: AppConfig,
) -> OrchestrationService {
    OrchestrationService::new(db.clone(), config, provider, Span::none())
}
