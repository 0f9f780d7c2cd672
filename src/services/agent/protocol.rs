//! Tool-Calling Protocol
//!
//! Drives at most two model calls. The first may request tool invocations;
//! each one is executed, answered with a tool-result message and decoded into
//! mutation commands. The second call sees the whole transcript and must
//! answer in text.

use std::sync::Arc;

use taskmate_core::MutationCommand;
use taskmate_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, Message, ProviderConfig, ToolCallMode,
};
use taskmate_tools::ToolRegistry;
use tracing::Span;

use crate::utils::error::AppResult;

/// Final text and the commands decoded along the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolOutcome {
    /// Trimmed reply text; `None` when the model produced nothing usable
    pub text: Option<String>,
    pub commands: Vec<MutationCommand>,
    /// Number of model calls made (1 or 2)
    pub model_calls: u32,
}

/// Bounded two-round tool-calling exchange
#[derive(Clone)]
pub struct ToolCallingProtocol {
    provider: Arc<dyn LlmProvider>,
    span: Span,
}

impl ToolCallingProtocol {
    pub fn new(provider: Arc<dyn LlmProvider>, span: Span) -> Self {
        Self { provider, span }
    }

    /// Run the exchange over `messages` with the tools in `registry`.
    ///
    /// Any model failure, unknown tool name or undecodable argument payload
    /// aborts the exchange with no commands.
    pub async fn run(
        &self,
        config: &ProviderConfig,
        messages: Vec<Message>,
        registry: &ToolRegistry,
    ) -> AppResult<ProtocolOutcome> {
        let tools = registry.definitions();

        let first = self
            .call(config, messages.clone(), &tools, ToolCallMode::Auto)
            .await?;

        if !first.has_tool_calls() {
            tracing::debug!(parent: &self.span, "no tool calls, single round");
            return Ok(ProtocolOutcome {
                text: first.text_or_none().map(str::to_string),
                commands: Vec::new(),
                model_calls: 1,
            });
        }

        tracing::info!(
            parent: &self.span,
            tool_calls = first.tool_calls.len(),
            "model requested tool calls"
        );

        let mut transcript = messages;
        transcript.push(Message::assistant_tool_calls(
            first.content.clone(),
            &first.tool_calls,
        ));

        let mut commands = Vec::new();
        for call in &first.tool_calls {
            let tool = registry.resolve(&call.name)?;
            let result = tool.execute(&call.arguments).await;
            tracing::debug!(
                parent: &self.span,
                tool = %call.name,
                call_id = %call.id,
                success = result.success,
                "tool executed"
            );
            transcript.push(Message::tool_result(
                &call.id,
                result.to_content(),
                !result.success,
            ));

            commands.extend(taskmate_tools::decode(&call.name, &call.arguments)?);
        }

        let second = self
            .call(config, transcript, &tools, ToolCallMode::None)
            .await?;

        Ok(ProtocolOutcome {
            text: second.text_or_none().map(str::to_string),
            commands,
            model_calls: 2,
        })
    }

    async fn call(
        &self,
        config: &ProviderConfig,
        messages: Vec<Message>,
        tools: &[taskmate_llm::ToolDefinition],
        mode: ToolCallMode,
    ) -> AppResult<LlmResponse> {
        tracing::debug!(
            parent: &self.span,
            provider = self.provider.name(),
            model = %config.model,
            messages = messages.len(),
            tool_choice = mode.as_str(),
            "calling model"
        );
        let response = self
            .provider
            .send_message(
                config,
                messages,
                tools.to_vec(),
                LlmRequestOptions::with_tool_call_mode(mode),
            )
            .await?;
        Ok(response)
    }
}

impl std::fmt::Debug for ToolCallingProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallingProtocol")
            .field("provider", &self.provider.name())
            .finish()
    }
}
