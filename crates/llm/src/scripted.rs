//! Scripted Provider
//!
//! Replays a queue of canned responses instead of calling a network endpoint.
//! Every request is recorded so callers can assert on what was sent.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::provider::LlmProvider;
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ToolDefinition,
};

/// One request as seen by the [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub options: LlmRequestOptions,
}

/// FIFO replay provider.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider pre-loaded with replies, consumed in order.
    pub fn with_replies(replies: impl IntoIterator<Item = LlmResult<LlmResponse>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every request received so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send_message(
        &self,
        config: &ProviderConfig,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.requests.lock().await.push(RecordedRequest {
            model: config.model.clone(),
            messages,
            tools,
            options,
        });

        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Other {
                    message: "scripted provider has no reply left".to_string(),
                })
            })
    }
}
