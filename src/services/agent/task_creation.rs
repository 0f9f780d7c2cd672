//! Task Creation Agent
//!
//! Turns free text into one `create_task` command. The model is called once
//! without tools and must answer with a single JSON task object.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use taskmate_core::{time, CreateTaskCommand, MutationCommand, NewStep, Priority};
use taskmate_llm::{LlmProvider, LlmRequestOptions, Message, ToolCallMode};
use taskmate_tools::ToolError;
use tracing::Span;

use super::prompts::TASK_CREATION_SYSTEM_PROMPT;
use super::{Agent, AgentKind, AgentRequest, AgentResponse};
use crate::utils::error::AppResult;
use crate::utils::json::extract_json_object;

const CREATED_MESSAGE: &str =
    "I've turned that text into a task and broken it down into actionable steps.";

/// Task object as written by the model
#[derive(Debug, Deserialize)]
struct TaskDraft {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "time::deserialize_opt")]
    due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    steps: Vec<StepDraft>,
}

#[derive(Debug, Deserialize)]
struct StepDraft {
    title: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    estimate_minutes: Option<i64>,
    #[serde(default)]
    order_index: Option<i64>,
}

pub struct TaskCreationAgent {
    provider: Arc<dyn LlmProvider>,
    span: Span,
}

impl TaskCreationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, span: Span) -> Self {
        Self { provider, span }
    }
}

#[async_trait]
impl Agent for TaskCreationAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TaskCreation
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse> {
        let messages = vec![
            Message::system(TASK_CREATION_SYSTEM_PROMPT),
            Message::system(format!(
                "Current time now: {}",
                request.now.to_rfc3339_opts(SecondsFormat::Secs, true)
            )),
            Message::user(request.input.clone()),
        ];

        let response = self
            .provider
            .send_message(
                &request.provider,
                messages,
                Vec::new(),
                LlmRequestOptions::with_tool_call_mode(ToolCallMode::None),
            )
            .await?;

        let reply = response.text_or_none().unwrap_or_default();
        let command = parse_task_reply(reply)?;
        tracing::info!(
            parent: &self.span,
            title = %command.title,
            steps = command.steps.len(),
            "task drafted from text"
        );

        Ok(AgentResponse {
            assistant_message: CREATED_MESSAGE.to_string(),
            commands: vec![MutationCommand::CreateTask(command)],
        })
    }
}

/// Decode a model reply into a `create_task` command.
///
/// Steps are ordered by `order_index` when given; a missing or unknown
/// priority becomes medium and non-positive estimates are dropped.
pub fn parse_task_reply(reply: &str) -> AppResult<CreateTaskCommand> {
    let json = extract_json_object(reply);
    let draft: TaskDraft = serde_json::from_str(&json)
        .map_err(|e| ToolError::decode(AgentKind::TaskCreation.as_str(), e))?;

    let mut steps = draft.steps;
    steps.sort_by_key(|s| s.order_index.unwrap_or(i64::MAX));

    let command = CreateTaskCommand {
        title: draft.title.trim().to_string(),
        description: draft.description,
        priority: draft
            .priority
            .and_then(|p| p.trim().to_lowercase().parse::<Priority>().ok())
            .unwrap_or_default(),
        due_at: draft.due_at,
        steps: steps
            .into_iter()
            .map(|s| NewStep {
                title: s.title,
                detail: s.detail,
                estimate_minutes: s.estimate_minutes.filter(|m| *m >= 1),
                insert_after_step_id: None,
            })
            .collect(),
    };

    MutationCommand::CreateTask(command.clone()).validate()?;
    Ok(command)
}
