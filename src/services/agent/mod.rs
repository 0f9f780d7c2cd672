//! Agent Module
//!
//! Role-specific strategies that turn one user message plus its context into
//! a reply and zero or more mutation commands.
//!
//! ## Components
//!
//! - `router` - picks the agent for a request
//! - `protocol` - the two-call tool-calling exchange
//! - `context` - leading read-only system messages
//! - `fallback` - templated replies for blank model output
//! - `executor`, `planner`, `global` - tool-calling agents
//! - `summarizer`, `task_creation` - direct model calls without tools

pub mod context;
pub mod executor;
pub mod fallback;
pub mod global;
pub mod planner;
pub mod prompts;
pub mod protocol;
pub mod router;
pub mod summarizer;
pub mod task_creation;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskmate_core::{Dependency, MutationCommand, Task};
use taskmate_llm::ProviderConfig;

use crate::models::session::{ChatMessage, SessionKind};
use crate::utils::error::{AppError, AppResult};

pub use executor::ExecutorAgent;
pub use global::GlobalAgent;
pub use planner::PlannerAgent;
pub use protocol::{ProtocolOutcome, ToolCallingProtocol};
pub use router::{KeywordRouter, LlmClassifierRouter, RouteRequest, Router};
pub use summarizer::SummarizerAgent;
pub use task_creation::TaskCreationAgent;

/// Agent roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Executor,
    Planner,
    Summarizer,
    Global,
    TaskCreation,
}

impl AgentKind {
    /// Roles a chat message can be routed to
    pub const ROUTABLE: &'static [AgentKind] = &[
        AgentKind::Executor,
        AgentKind::Planner,
        AgentKind::Summarizer,
        AgentKind::Global,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Executor => "executor",
            AgentKind::Planner => "planner",
            AgentKind::Summarizer => "summarizer",
            AgentKind::Global => "global",
            AgentKind::TaskCreation => "task_creation",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "executor" => Ok(AgentKind::Executor),
            "planner" => Ok(AgentKind::Planner),
            "summarizer" => Ok(AgentKind::Summarizer),
            "global" => Ok(AgentKind::Global),
            "task_creation" => Ok(AgentKind::TaskCreation),
            other => Err(AppError::validation(format!("unknown agent: {}", other))),
        }
    }
}

/// Everything an agent may read. Agents never query storage themselves.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub owner_id: i64,
    pub session_kind: SessionKind,
    /// Task bound to the session, if any
    pub task: Option<Task>,
    /// Edges touching the bound task
    pub dependencies: Vec<Dependency>,
    /// Owner's open tasks, loaded when the global agent handles the turn
    pub open_tasks: Vec<Task>,
    /// Recent conversation, oldest first
    pub history: Vec<ChatMessage>,
    pub input: String,
    pub now: DateTime<Utc>,
    pub provider: ProviderConfig,
}

impl AgentRequest {
    /// Request with no task context, as used for text-to-task
    pub fn bare(owner_id: i64, input: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            owner_id,
            session_kind: SessionKind::Global,
            task: None,
            dependencies: Vec::new(),
            open_tasks: Vec::new(),
            history: Vec::new(),
            input: input.into(),
            now: Utc::now(),
            provider,
        }
    }
}

/// An agent's reply and the commands it derived
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResponse {
    pub assistant_message: String,
    pub commands: Vec<MutationCommand>,
}

/// A role-specific strategy
#[async_trait]
pub trait Agent: Send + Sync {
    fn kind(&self) -> AgentKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse>;
}

/// Assemble a response, substituting the fallback template for blank text
pub(crate) fn respond(
    kind: AgentKind,
    text: Option<String>,
    commands: Vec<MutationCommand>,
) -> AgentResponse {
    let assistant_message = text.unwrap_or_else(|| fallback::fallback_message(kind, &commands));
    AgentResponse {
        assistant_message,
        commands,
    }
}
