//! Global Agent
//!
//! Cross-task assistant for the global session. Sees an overview of the
//! owner's open tasks and can flag today's focus.

use async_trait::async_trait;
use taskmate_tools::catalogue::GLOBAL_TOOLS;
use taskmate_tools::ToolRegistry;
use tracing::Span;

use super::context::{build_messages, ContextScope};
use super::prompts::GLOBAL_SYSTEM_PROMPT;
use super::protocol::ToolCallingProtocol;
use super::{respond, Agent, AgentKind, AgentRequest, AgentResponse};
use crate::utils::error::AppResult;

pub struct GlobalAgent {
    protocol: ToolCallingProtocol,
    tools: ToolRegistry,
    span: Span,
}

impl GlobalAgent {
    pub fn new(protocol: ToolCallingProtocol, span: Span) -> Self {
        Self {
            protocol,
            tools: ToolRegistry::from_catalogue(GLOBAL_TOOLS),
            span,
        }
    }
}

#[async_trait]
impl Agent for GlobalAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Global
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse> {
        let messages = build_messages(GLOBAL_SYSTEM_PROMPT, request, ContextScope::Overview)?;
        let outcome = self
            .protocol
            .run(&request.provider, messages, &self.tools)
            .await?;
        tracing::debug!(
            parent: &self.span,
            open_tasks = request.open_tasks.len(),
            commands = outcome.commands.len(),
            "global agent finished"
        );
        Ok(respond(self.kind(), outcome.text, outcome.commands))
    }
}
