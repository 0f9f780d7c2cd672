//! Router Integration Tests

use std::sync::Arc;

use taskmate::models::session::SessionKind;
use taskmate::services::agent::{
    AgentKind, KeywordRouter, LlmClassifierRouter, RouteRequest, Router,
};
use taskmate_llm::{LlmError, LlmResponse, ProviderConfig, ScriptedProvider, ToolCallMode};
use tracing::Span;

fn request<'a>(kind: SessionKind, text: &'a str, provider: &'a ProviderConfig) -> RouteRequest<'a> {
    RouteRequest {
        session_kind: kind,
        has_task: kind == SessionKind::Task,
        text,
        provider,
    }
}

#[tokio::test]
async fn test_scenario_a_step_done_goes_to_executor() {
    let provider = ProviderConfig::default();
    let router = KeywordRouter::new(Span::none());
    let agent = router
        .route(&request(SessionKind::Task, "我完成了第一步", &provider))
        .await;
    assert_eq!(agent, AgentKind::Executor);
}

#[tokio::test]
async fn test_keyword_router_is_total_and_deterministic() {
    let provider = ProviderConfig::default();
    let router = KeywordRouter::new(Span::none());
    let inputs = [
        "",
        "   ",
        "please SUMMARIZE this",
        "回顾一下这周",
        "can we re-plan the launch",
        "把第二步拆解一下",
        "just chatting",
        "🙂",
    ];

    for kind in [SessionKind::Task, SessionKind::Global] {
        for input in inputs {
            let first = router.route(&request(kind, input, &provider)).await;
            let second = router.route(&request(kind, input, &provider)).await;
            assert_eq!(first, second, "input {:?}", input);
            assert!(AgentKind::ROUTABLE.contains(&first));
            if kind == SessionKind::Global {
                assert_eq!(first, AgentKind::Global);
            }
        }
    }
}

#[tokio::test]
async fn test_classifier_not_consulted_when_keyword_matches() {
    let provider = Arc::new(ScriptedProvider::new());
    let router = LlmClassifierRouter::new(provider.clone(), Span::none());
    let config = ProviderConfig::default();

    let agent = router
        .route(&request(SessionKind::Task, "show me a summary", &config))
        .await;
    assert_eq!(agent, AgentKind::Summarizer);
    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_classifier_label_used_for_unmatched_text() {
    let provider = Arc::new(ScriptedProvider::with_replies([Ok(LlmResponse::text(
        "```json\n{\"agent\": \"planner\"}\n```",
    ))]));
    let router = LlmClassifierRouter::new(provider.clone(), Span::none());
    let config = ProviderConfig::default();

    let agent = router
        .route(&request(SessionKind::Task, "move everything to next week", &config))
        .await;
    assert_eq!(agent, AgentKind::Planner);

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].tools.is_empty());
    assert_eq!(requests[0].options.tool_call_mode, ToolCallMode::None);
    assert!(requests[0].messages[0]
        .text_content()
        .contains("move everything to next week"));
}

#[tokio::test]
async fn test_classifier_defaults_to_executor() {
    let replies = vec![
        Err(LlmError::NetworkError {
            message: "connection reset".to_string(),
        }),
        Ok(LlmResponse::text("I think the planner")),
        Ok(LlmResponse::text(r#"{"agent": "task_creation"}"#)),
        Ok(LlmResponse::text(r#"{"agent": "manager"}"#)),
        Ok(LlmResponse::text("")),
    ];
    let count = replies.len();
    let provider = Arc::new(ScriptedProvider::with_replies(replies));
    let router = LlmClassifierRouter::new(provider.clone(), Span::none());
    let config = ProviderConfig::default();

    for _ in 0..count {
        let agent = router
            .route(&request(SessionKind::Task, "hmm", &config))
            .await;
        assert_eq!(agent, AgentKind::Executor);
    }
    assert_eq!(provider.remaining().await, 0);
}
