//! Executor Agent
//!
//! Applies progress updates to the bound task: step status changes, blocking
//! reasons, deadline moves.

use async_trait::async_trait;
use taskmate_tools::catalogue::EXECUTOR_TOOLS;
use taskmate_tools::ToolRegistry;
use tracing::Span;

use super::context::{build_messages, ContextScope};
use super::prompts::EXECUTOR_SYSTEM_PROMPT;
use super::protocol::ToolCallingProtocol;
use super::{respond, Agent, AgentKind, AgentRequest, AgentResponse};
use crate::utils::error::AppResult;

pub struct ExecutorAgent {
    protocol: ToolCallingProtocol,
    tools: ToolRegistry,
    span: Span,
}

impl ExecutorAgent {
    pub fn new(protocol: ToolCallingProtocol, span: Span) -> Self {
        Self {
            protocol,
            tools: ToolRegistry::from_catalogue(EXECUTOR_TOOLS),
            span,
        }
    }
}

#[async_trait]
impl Agent for ExecutorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Executor
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse> {
        let messages = build_messages(
            EXECUTOR_SYSTEM_PROMPT,
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
            "executor finished"
        );
        Ok(respond(self.kind(), outcome.text, outcome.commands))
    }
}
