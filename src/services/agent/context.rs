//! Agent Context Messages
//!
//! Builds the message list an agent sends: its system prompt, read-only
//! context as leading system messages, the recent conversation, then the
//! user's input.

use chrono::SecondsFormat;
use serde_json::json;
use taskmate_core::Task;
use taskmate_llm::Message;

use super::AgentRequest;
use crate::models::session::{ChatMessage, ChatRole};
use crate::utils::error::AppResult;

/// Which read-only context an agent receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextScope {
    /// The bound task, optionally with its dependency edges
    Task { with_dependencies: bool },
    /// The owner's open tasks
    Overview,
}

pub fn build_messages(
    system_prompt: &str,
    request: &AgentRequest,
    scope: ContextScope,
) -> AppResult<Vec<Message>> {
    let mut messages = vec![Message::system(system_prompt)];

    match scope {
        ContextScope::Task { with_dependencies } => {
            match &request.task {
                Some(task) => messages.push(Message::system(format!(
                    "Current task state (JSON, read-only):\n{}",
                    serde_json::to_string(task)?
                ))),
                None => messages.push(Message::system("No task is bound to this conversation.")),
            }
            if with_dependencies && !request.dependencies.is_empty() {
                messages.push(Message::system(format!(
                    "Dependencies (JSON, read-only):\n{}\nWhen a task or step finishes, \
                     successors linked here may be unlocked automatically.",
                    serde_json::to_string(&request.dependencies)?
                )));
            }
        }
        ContextScope::Overview => {
            messages.push(Message::system(format!(
                "Open tasks overview (JSON, read-only):\n{}",
                serde_json::to_string(&overview(&request.open_tasks))?
            )));
        }
    }

    messages.push(Message::system(format!(
        "Current time now: {}",
        request.now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )));

    messages.extend(history_messages(&request.history));
    messages.push(Message::user(request.input.clone()));
    Ok(messages)
}

/// Conversation history as model messages; blank messages are dropped
pub fn history_messages(history: &[ChatMessage]) -> Vec<Message> {
    history
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| match m.role {
            ChatRole::User => Message::user(m.content.clone()),
            ChatRole::Assistant => Message::assistant(m.content.clone()),
            ChatRole::System => Message::system(m.content.clone()),
        })
        .collect()
}

fn overview(tasks: &[Task]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = tasks
        .iter()
        .map(|task| {
            let steps: Vec<serde_json::Value> = task
                .steps
                .iter()
                .map(|s| json!({"id": s.id, "title": s.title, "status": s.status}))
                .collect();
            json!({
                "id": task.id,
                "title": task.title,
                "status": task.status,
                "priority": task.priority,
                "due_at": task.due_at,
                "is_focus_today": task.is_focus_today,
                "steps": steps,
            })
        })
        .collect();
    serde_json::Value::Array(items)
}
