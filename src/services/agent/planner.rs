//! Planner Agent
//!
//! Re-plans the bound task: new steps, reordering, rescheduling and
//! dependency edges.

use async_trait::async_trait;
use taskmate_tools::catalogue::PLANNER_TOOLS;
use taskmate_tools::ToolRegistry;
use tracing::Span;

use super::context::{build_messages, ContextScope};
use super::prompts::PLANNER_SYSTEM_PROMPT;
use super::protocol::ToolCallingProtocol;
use super::{respond, Agent, AgentKind, AgentRequest, AgentResponse};
use crate::utils::error::AppResult;

pub struct PlannerAgent {
    protocol: ToolCallingProtocol,
    tools: ToolRegistry,
    span: Span,
}

impl PlannerAgent {
    pub fn new(protocol: ToolCallingProtocol, span: Span) -> Self {
        Self {
            protocol,
            tools: ToolRegistry::from_catalogue(PLANNER_TOOLS),
            span,
        }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Planner
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse> {
        let messages = build_messages(
            PLANNER_SYSTEM_PROMPT,
            request,
            ContextScope::Task {
                with_dependencies: true,
            },
        )?;
        let outcome = self
            .protocol
            .run(&request.provider, messages, &self.tools)
            .await?;
        tracing::debug!(
            parent: &self.span,
            commands = outcome.commands.len(),
            blank = outcome.text.is_none(),
            "planner finished"
        );
        Ok(respond(self.kind(), outcome.text, outcome.commands))
    }
}
