//! Summarizer Agent
//!
//! Read-only summary of the bound task and recent conversation. Calls the
//! model once without tools and never produces commands.

use std::sync::Arc;

use async_trait::async_trait;
use taskmate_llm::{LlmProvider, LlmRequestOptions, ToolCallMode};
use tracing::Span;

use super::context::{build_messages, ContextScope};
use super::prompts::SUMMARIZER_SYSTEM_PROMPT;
use super::{respond, Agent, AgentKind, AgentRequest, AgentResponse};
use crate::utils::error::AppResult;

pub struct SummarizerAgent {
    provider: Arc<dyn LlmProvider>,
    span: Span,
}

impl SummarizerAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, span: Span) -> Self {
        Self { provider, span }
    }
}

#[async_trait]
impl Agent for SummarizerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Summarizer
    }

    async fn handle(&self, request: &AgentRequest) -> AppResult<AgentResponse> {
        let messages = build_messages(
            SUMMARIZER_SYSTEM_PROMPT,
            request,
            ContextScope::Task {
                with_dependencies: false,
            },
        )?;
        let response = self
            .provider
            .send_message(
                &request.provider,
                messages,
                Vec::new(),
                LlmRequestOptions::with_tool_call_mode(ToolCallMode::None),
            )
            .await?;
        if response.has_tool_calls() {
            tracing::warn!(
                parent: &self.span,
                tool_calls = response.tool_calls.len(),
                "summarizer reply carried tool calls, ignored"
            );
        }
        Ok(respond(
            self.kind(),
            response.text_or_none().map(str::to_string),
            Vec::new(),
        ))
    }
}
