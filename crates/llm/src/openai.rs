//! OpenAI-Compatible Provider
//!
//! Implementation of the LlmProvider trait for any endpoint that speaks the
//! OpenAI chat-completions wire format (OpenAI, DeepSeek, Qwen, Ollama, ...).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolDefinition, UsageStats,
};
use crate::http_client::{build_http_client, DEFAULT_TIMEOUT};

/// OpenAI-compatible chat-completions provider
pub struct OpenAIProvider {
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a provider with a default HTTP client.
    pub fn new() -> LlmResult<Self> {
        Ok(Self::with_client(build_http_client(DEFAULT_TIMEOUT)?))
    }

    /// Create a provider around an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "temperature": options.temperature_override.unwrap_or(config.temperature),
        });

        if let Some(effort) = &config.reasoning_effort {
            body["reasoning_effort"] = serde_json::json!(effort);
        }

        let openai_messages: Vec<serde_json::Value> =
            messages.iter().map(|m| self.message_to_openai(m)).collect();
        body["messages"] = serde_json::json!(openai_messages);

        if !tools.is_empty() {
            let openai_tools: Vec<serde_json::Value> =
                tools.iter().map(|t| self.tool_to_openai(t)).collect();
            body["tools"] = serde_json::json!(openai_tools);
            body["tool_choice"] = serde_json::json!(options.tool_call_mode.as_str());
        }

        body
    }

    /// Convert a Message to OpenAI API format
    fn message_to_openai(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        };

        let tool_result = message.content.iter().find_map(|c| match c {
            MessageContent::ToolResult {
                tool_use_id,
                content,
                ..
            } => Some((tool_use_id, content)),
            _ => None,
        });
        if let Some((tool_use_id, content)) = tool_result {
            return serde_json::json!({
                "role": "tool",
                "tool_call_id": tool_use_id,
                "content": content,
            });
        }

        let tool_calls: Vec<serde_json::Value> = message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolUse {
                    id,
                    name,
                    arguments,
                } => Some(serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": arguments,
                    }
                })),
                _ => None,
            })
            .collect();

        let text_content = message.text_content();

        if !tool_calls.is_empty() {
            let mut msg = serde_json::json!({
                "role": role,
                "tool_calls": tool_calls,
            });
            // Some compatible servers reject a missing content field.
            msg["content"] = if text_content.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::json!(text_content)
            };
            return msg;
        }

        serde_json::json!({
            "role": role,
            "content": text_content,
        })
    }

    /// Convert a ToolDefinition to OpenAI API format
    fn tool_to_openai(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        })
    }

    /// Parse a response from the API; only the first choice is used.
    fn parse_response(&self, response: OpenAIResponse) -> LlmResult<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError {
                message: "response contained no choices".to_string(),
            })?;

        let (content, tool_calls) = match choice.message {
            Some(msg) => {
                let calls = msg
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments: tc.function.arguments,
                    })
                    .collect();
                (msg.content, calls)
            }
            None => (None, Vec::new()),
        };

        let stop_reason = choice
            .finish_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
            model: response.model.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn send_message(
        &self,
        config: &ProviderConfig,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error(self.name()))?;

        let body = self.build_request_body(config, &messages, &tools, &options);
        debug!(
            model = %config.model,
            messages = messages.len(),
            tools = tools.len(),
            tool_choice = options.tool_call_mode.as_str(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(config.chat_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if !(200..300).contains(&status) {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let openai_response: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(openai_response)
    }
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
