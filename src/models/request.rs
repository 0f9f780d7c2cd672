//! Request and Response Models
//!
//! Inbound requests and outbound responses of the orchestration service.

use serde::{Deserialize, Serialize};
use taskmate_core::MutationCommand;
use taskmate_llm::ProviderConfig;
use tokio_util::sync::CancellationToken;

use crate::models::settings::{AppConfig, ConfigUpdate};

/// One chat message sent to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub owner_id: i64,
    pub session_id: i64,
    pub input: String,
    /// Per-request model endpoint; the configured default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    /// Cancelled by the caller to abandon the request before any mutation
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

impl ChatRequest {
    pub fn new(owner_id: i64, session_id: i64, input: impl Into<String>) -> Self {
        Self {
            owner_id,
            session_id,
            input: input.into(),
            provider: None,
            cancel: None,
        }
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Free text to be turned into a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub owner_id: i64,
    #[serde(rename = "create_from_text")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

impl CreateTaskRequest {
    pub fn new(owner_id: i64, text: impl Into<String>) -> Self {
        Self {
            owner_id,
            text: text.into(),
            provider: None,
            cancel: None,
        }
    }
}

/// Partial settings change, persisted before the service is rebuilt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureRequest {
    pub config_update: ConfigUpdate,
}

/// Any inbound request shape, as read by the binary
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundRequest {
    CreateTask(CreateTaskRequest),
    Chat(ChatRequest),
    Configure(ConfigureRequest),
}

/// Response to an `InboundRequest`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundResponse {
    Chat(ChatResponse),
    /// Effective configuration after an update
    Config(AppConfig),
}

/// Outcome of one request cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Correlation id also recorded on the request's tracing span
    pub request_id: String,
    /// Agent that handled the request
    pub agent: String,
    pub assistant_message: String,
    /// Commands applied, in application order
    pub applied_commands: Vec<MutationCommand>,
    /// Ids of tasks created by `create_task` commands
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_task_ids: Vec<i64>,
}
