//! Router
//!
//! Picks the agent for a chat message. The keyword router is a pure function
//! of session kind and text; the classifier router asks the model only when
//! no keyword class matches.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use taskmate_llm::{LlmProvider, LlmRequestOptions, Message, ProviderConfig, ToolCallMode};
use tracing::Span;

use super::prompts::router_prompt;
use super::AgentKind;
use crate::models::session::SessionKind;
use crate::utils::json::extract_json_object;

const SUMMARIZER_KEYWORDS: &[&str] = &[
    "总结",
    "overview",
    "回顾",
    "progress",
    "summary",
    "summarize",
];

const PLANNER_KEYWORDS: &[&str] = &[
    "重新规划",
    "重排",
    "reschedule",
    "拆解",
    "replan",
    "re-plan",
    "break down",
];

/// What a router may look at
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub session_kind: SessionKind,
    pub has_task: bool,
    pub text: &'a str,
    pub provider: &'a ProviderConfig,
}

/// Agent selection strategy
#[async_trait]
pub trait Router: Send + Sync {
    async fn route(&self, request: &RouteRequest<'_>) -> AgentKind;
}

/// Deterministic keyword routing
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    span: Span,
}

impl KeywordRouter {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Keyword class of a message; `None` when nothing matched.
    ///
    /// Global sessions always go to the global agent.
    pub fn classify(&self, session_kind: SessionKind, text: &str) -> Option<AgentKind> {
        if session_kind == SessionKind::Global {
            return Some(AgentKind::Global);
        }

        let text = text.to_lowercase();
        if SUMMARIZER_KEYWORDS.iter().any(|k| text.contains(k)) {
            return Some(AgentKind::Summarizer);
        }
        if PLANNER_KEYWORDS.iter().any(|k| text.contains(k)) {
            return Some(AgentKind::Planner);
        }
        None
    }

    /// Total routing: unmatched text goes to the executor
    pub fn route_text(&self, session_kind: SessionKind, text: &str) -> AgentKind {
        let agent = self
            .classify(session_kind, text)
            .unwrap_or(AgentKind::Executor);
        tracing::debug!(parent: &self.span, %session_kind, agent = %agent, "keyword route");
        agent
    }
}

#[async_trait]
impl Router for KeywordRouter {
    async fn route(&self, request: &RouteRequest<'_>) -> AgentKind {
        self.route_text(request.session_kind, request.text)
    }
}

#[derive(Debug, Deserialize)]
struct Classification {
    agent: String,
}

/// Keyword routing with a model classifier for unmatched messages.
///
/// Any model error, unparsable reply or label outside the four routable
/// agents falls back to the executor.
pub struct LlmClassifierRouter {
    keywords: KeywordRouter,
    provider: Arc<dyn LlmProvider>,
    span: Span,
}

impl LlmClassifierRouter {
    pub fn new(provider: Arc<dyn LlmProvider>, span: Span) -> Self {
        Self {
            keywords: KeywordRouter::new(span.clone()),
            provider,
            span,
        }
    }

    async fn classify_with_model(&self, request: &RouteRequest<'_>) -> AgentKind {
        let messages = vec![Message::system(router_prompt(
            request.session_kind.as_str(),
            request.has_task,
            request.text,
        ))];

        let response = match self
            .provider
            .send_message(
                request.provider,
                messages,
                Vec::new(),
                LlmRequestOptions::with_tool_call_mode(ToolCallMode::None),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(parent: &self.span, error = %e, "router model call failed, using executor");
                return AgentKind::Executor;
            }
        };

        let reply = response.text_or_none().unwrap_or_default();
        match parse_classification(reply) {
            Some(agent) => {
                tracing::debug!(parent: &self.span, agent = %agent, "model route");
                agent
            }
            None => {
                tracing::warn!(parent: &self.span, reply, "unusable router reply, using executor");
                AgentKind::Executor
            }
        }
    }
}

#[async_trait]
impl Router for LlmClassifierRouter {
    async fn route(&self, request: &RouteRequest<'_>) -> AgentKind {
        match self.keywords.classify(request.session_kind, request.text) {
            Some(agent) => agent,
            None => self.classify_with_model(request).await,
        }
    }
}

/// Routable agent named by a `{"agent": "..."}` reply
fn parse_classification(reply: &str) -> Option<AgentKind> {
    let parsed: Classification = serde_json::from_str(&extract_json_object(reply)).ok()?;
    let agent = parsed.agent.trim().parse::<AgentKind>().ok()?;
    AgentKind::ROUTABLE.contains(&agent).then_some(agent)
}
