//! Orchestration Service Integration Tests
//!
//! Full request cycles over an in-memory database and a scripted model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use taskmate::models::session::ChatRole;
use taskmate::storage::{Database, SessionRepo};
use taskmate::{
    AppConfig, AppError, ChatRequest, CreateTaskRequest, OrchestrationService, RouterMode,
};
use taskmate_core::{
    DependencyAction, DependencyCondition, MutationCommand, NewDependency, Priority, StepStatus,
    TaskStatus,
};
use taskmate_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
    ScriptedProvider, ToolCallMode, ToolDefinition,
};
use taskmate_tools::ToolError;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::support::{
    add_edge, database, load_task, open_session, scripted, seed_task, service, service_with,
    tool_call, tool_reply,
};

fn history(db: &Database, session_id: i64) -> Vec<(ChatRole, String, Option<String>)> {
    let conn = db.get_connection().unwrap();
    SessionRepo::new(&conn)
        .list_recent(session_id, 50)
        .unwrap()
        .into_iter()
        .map(|m| (m.role, m.content, m.agent_name))
        .collect()
}

fn mark_done(task_id: i64, step_id: i64) -> serde_json::Value {
    json!({
        "task_id": task_id,
        "updates": [{"step_id": step_id, "fields": {"status": "done"}}]
    })
}

#[tokio::test]
async fn test_executor_cycle_applies_and_records() {
    let db = database();
    let task = seed_task(&db, 1, "Tax return", &["collect receipts", "fill form"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![
        tool_reply(vec![tool_call(
            "call_1",
            "update_steps",
            mark_done(task.id, task.steps[0].id),
        )]),
        LlmResponse::text("Great, receipts are collected."),
    ]);
    let service = service(&db, provider.clone());

    let response = service
        .handle_message(ChatRequest::new(1, session.id, "我完成了第一步"))
        .await
        .unwrap();

    assert_eq!(response.agent, "executor");
    assert_eq!(response.assistant_message, "Great, receipts are collected.");
    assert_eq!(response.applied_commands.len(), 1);
    assert!(!response.request_id.is_empty());

    let task = load_task(&db, task.id);
    assert_eq!(task.steps[0].status, StepStatus::Done);
    assert_eq!(task.status, TaskStatus::InProgress);

    assert_eq!(
        history(&db, session.id),
        vec![
            (ChatRole::User, "我完成了第一步".to_string(), None),
            (
                ChatRole::Assistant,
                "Great, receipts are collected.".to_string(),
                Some("executor".to_string())
            ),
        ]
    );

    let requests = provider.requests().await;
    let tool_names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tool_names, vec!["update_task", "update_steps"]);
}

#[tokio::test]
async fn test_blank_reply_uses_template() {
    let db = database();
    let task = seed_task(&db, 1, "Laundry", &["wash", "dry"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![
        tool_reply(vec![tool_call(
            "call_1",
            "update_steps",
            mark_done(task.id, task.steps[0].id),
        )]),
        LlmResponse::text("   "),
    ]);

    let response = service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "washed it"))
        .await
        .unwrap();

    assert_eq!(
        response.assistant_message,
        "1 step marked done. Let me know if you'd like any further changes."
    );
}

#[tokio::test]
async fn test_text_only_reply_makes_one_call() {
    let db = database();
    let task = seed_task(&db, 1, "Read book", &["chapter 1"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![LlmResponse::text("Which chapter are you on?")]);

    let response = service(&db, provider.clone())
        .handle_message(ChatRequest::new(1, session.id, "reading now"))
        .await
        .unwrap();

    assert_eq!(response.assistant_message, "Which chapter are you on?");
    assert!(response.applied_commands.is_empty());
    assert_eq!(provider.call_count().await, 1);
    assert_eq!(history(&db, session.id).len(), 2);
}

#[tokio::test]
async fn test_failed_command_leaves_no_trace() {
    let db = database();
    let mine = seed_task(&db, 1, "Mine", &["a"]);
    let theirs = seed_task(&db, 2, "Theirs", &["b"]);
    let session = open_session(&db, 1, Some(mine.id));
    let provider = scripted(vec![
        tool_reply(vec![
            tool_call("call_1", "update_steps", mark_done(mine.id, mine.steps[0].id)),
            tool_call("call_2", "update_steps", mark_done(theirs.id, theirs.steps[0].id)),
        ]),
        LlmResponse::text("Done both."),
    ]);

    let err = service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "finished everything"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(load_task(&db, mine.id).steps[0].status, StepStatus::Todo);
    assert_eq!(load_task(&db, theirs.id).steps[0].status, StepStatus::Todo);
    assert!(history(&db, session.id).is_empty());
}

#[tokio::test]
async fn test_unknown_tool_fails_request() {
    let db = database();
    let task = seed_task(&db, 1, "Garden", &["weed"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![tool_reply(vec![tool_call(
        "call_1",
        "delete_task",
        json!({"task_id": task.id}),
    )])]);

    let err = service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "drop it"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Tool(ToolError::UnknownTool { .. })));
    assert!(history(&db, session.id).is_empty());
}

#[tokio::test]
async fn test_model_failure_fails_request() {
    let db = database();
    let task = seed_task(&db, 1, "Gym", &["warm up"]);
    let session = open_session(&db, 1, Some(task.id));
    // no replies queued: the scripted provider errors
    let provider = scripted(Vec::new());

    let err = service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "warmed up"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Llm(_)));
    assert!(history(&db, session.id).is_empty());
}

#[tokio::test]
async fn test_summary_request_uses_no_tools() {
    let db = database();
    let task = seed_task(&db, 1, "Thesis", &["research", "write"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![LlmResponse::text("Research is underway.")]);

    let response = service(&db, provider.clone())
        .handle_message(ChatRequest::new(1, session.id, "Give me a summary"))
        .await
        .unwrap();

    assert_eq!(response.agent, "summarizer");
    let requests = provider.requests().await;
    assert!(requests[0].tools.is_empty());
    assert_eq!(requests[0].options.tool_call_mode, ToolCallMode::None);
}

#[tokio::test]
async fn test_global_session_focus_drops_foreign_ids() {
    let db = database();
    let mine = seed_task(&db, 1, "Mine", &[]);
    let theirs = seed_task(&db, 2, "Theirs", &[]);
    let session = open_session(&db, 1, None);
    let provider = scripted(vec![
        tool_reply(vec![tool_call(
            "call_1",
            "mark_tasks_focus_today",
            json!({"task_ids": [mine.id, theirs.id]}),
        )]),
        LlmResponse::text("Focused on your task for today."),
    ]);

    let response = service(&db, provider.clone())
        .handle_message(ChatRequest::new(1, session.id, "what should I do today?"))
        .await
        .unwrap();

    assert_eq!(response.agent, "global");
    assert!(load_task(&db, mine.id).is_focus_today);
    assert!(!load_task(&db, theirs.id).is_focus_today);

    // the overview lists only the caller's open tasks
    let requests = provider.requests().await;
    let overview = requests[0]
        .messages
        .iter()
        .map(|m| m.text_content())
        .find(|text| text.starts_with("Open tasks overview"))
        .unwrap();
    assert!(overview.contains("Mine"));
    assert!(!overview.contains("Theirs"));
}

#[tokio::test]
async fn test_history_reaches_next_turn() {
    let db = database();
    let task = seed_task(&db, 1, "Move house", &["pack"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![
        LlmResponse::text("How many boxes?"),
        LlmResponse::text("Got it."),
    ]);
    let service = service(&db, provider.clone());

    service
        .handle_message(ChatRequest::new(1, session.id, "starting to pack"))
        .await
        .unwrap();
    service
        .handle_message(ChatRequest::new(1, session.id, "about twenty"))
        .await
        .unwrap();

    let requests = provider.requests().await;
    let texts: Vec<String> = requests[1].messages.iter().map(|m| m.text_content()).collect();
    let asked = texts.iter().position(|t| t == "How many boxes?").unwrap();
    assert_eq!(texts[asked - 1], "starting to pack");
    assert_eq!(texts.last().map(String::as_str), Some("about twenty"));
}

#[tokio::test]
async fn test_cancelled_request_mutates_nothing() {
    let db = database();
    let task = seed_task(&db, 1, "Paint", &["prime"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![
        tool_reply(vec![tool_call(
            "call_1",
            "update_steps",
            mark_done(task.id, task.steps[0].id),
        )]),
        LlmResponse::text("Primed."),
    ]);
    let token = CancellationToken::new();
    token.cancel();

    let err = service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "primed").with_cancel(token))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Cancelled));
    assert_eq!(load_task(&db, task.id).steps[0].status, StepStatus::Todo);
    assert!(history(&db, session.id).is_empty());
}

#[tokio::test]
async fn test_foreign_session_is_forbidden() {
    let db = database();
    let task = seed_task(&db, 2, "Private", &[]);
    let session = open_session(&db, 2, Some(task.id));
    let provider = scripted(Vec::new());

    let err = service(&db, provider.clone())
        .handle_message(ChatRequest::new(1, session.id, "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_llm_fallback_router_picks_planner() {
    let db = database();
    let task = seed_task(&db, 1, "Conference talk", &["outline"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![
        LlmResponse::text(r#"{"agent": "planner"}"#),
        LlmResponse::text("Let's split the outline first."),
    ]);
    let config = AppConfig {
        router_mode: RouterMode::LlmFallback,
        ..Default::default()
    };

    let response = service_with(&db, provider.clone(), config)
        .handle_message(ChatRequest::new(1, session.id, "this feels too big"))
        .await
        .unwrap();

    assert_eq!(response.agent, "planner");
    let requests = provider.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].tools.len(), 4);
}

#[tokio::test]
async fn test_create_task_from_text() {
    let db = database();
    let reply = r#"```json
{
  "title": "Quarterly report",
  "description": "Q3 numbers for the board",
  "due_at": "2026-10-30",
  "priority": "high",
  "steps": [
    {"title": "Draft", "order_index": 2, "estimate_minutes": 90},
    {"title": "Gather numbers", "order_index": 1}
  ]
}
```"#;
    let provider = scripted(vec![LlmResponse::text(reply)]);

    let response = service(&db, provider)
        .create_task_from_text(CreateTaskRequest::new(
            7,
            "write the quarterly report by the end of the month",
        ))
        .await
        .unwrap();

    assert_eq!(response.agent, "task_creation");
    assert_eq!(response.created_task_ids.len(), 1);
    assert!(matches!(
        response.applied_commands[0],
        MutationCommand::CreateTask(_)
    ));

    let task = load_task(&db, response.created_task_ids[0]);
    assert_eq!(task.owner_id, 7);
    assert_eq!(task.title, "Quarterly report");
    assert_eq!(task.priority, Priority::High);
    assert!(task.due_at.is_some());
    let titles: Vec<&str> = task.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Gather numbers", "Draft"]);
    assert_eq!(task.steps[1].estimate_minutes, Some(90));
}

#[tokio::test]
async fn test_create_task_rejects_non_object_reply() {
    let db = database();
    let provider = scripted(vec![LlmResponse::text("Sure! I'll remember that.")]);

    let err = service(&db, provider)
        .create_task_from_text(CreateTaskRequest::new(1, "buy milk"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Tool(ToolError::Decode { ref tool, .. }) if tool == "task_creation"
    ));
}

#[tokio::test]
async fn test_request_provider_overrides_default() {
    let db = database();
    let task = seed_task(&db, 1, "Tax return", &["collect receipts"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = scripted(vec![LlmResponse::text("ok")]);
    let service = service(&db, provider.clone());

    let request = ChatRequest::new(1, session.id, "how is it going?").with_provider(ProviderConfig {
        model: "deepseek-chat".to_string(),
        ..Default::default()
    });
    service.handle_message(request).await.unwrap();

    let requests = provider.requests().await;
    assert_eq!(requests[0].model, "deepseek-chat");
}

#[tokio::test]
async fn test_classifier_global_route_gets_overview() {
    let db = database();
    let talk = seed_task(&db, 1, "Conference talk", &["outline"]);
    seed_task(&db, 1, "Tax return", &[]);
    let session = open_session(&db, 1, Some(talk.id));
    let provider = scripted(vec![
        LlmResponse::text(r#"{"agent": "global"}"#),
        LlmResponse::text("You have two things going on."),
    ]);
    let config = AppConfig {
        router_mode: RouterMode::LlmFallback,
        ..Default::default()
    };

    let response = service_with(&db, provider.clone(), config)
        .handle_message(ChatRequest::new(1, session.id, "what else is on my plate?"))
        .await
        .unwrap();

    assert_eq!(response.agent, "global");
    let requests = provider.requests().await;
    let overview = requests[1]
        .messages
        .iter()
        .map(|m| m.text_content())
        .find(|text| text.starts_with("Open tasks overview"))
        .unwrap();
    assert!(overview.contains("Tax return"));
    assert!(overview.contains("Conference talk"));
}

#[tokio::test]
async fn test_notice_follows_the_turn_that_caused_it() {
    let db = database();
    let task = seed_task(&db, 1, "Book venue", &["call venue", "sign contract"]);
    let session = open_session(&db, 1, Some(task.id));
    add_edge(
        &db,
        NewDependency {
            predecessor_task_id: task.id,
            predecessor_step_id: Some(task.steps[0].id),
            successor_task_id: task.id,
            successor_step_id: None,
            condition: DependencyCondition::StepDone,
            action: DependencyAction::NotifyOnly,
        },
    );
    let provider = scripted(vec![
        tool_reply(vec![tool_call(
            "call_1",
            "update_steps",
            mark_done(task.id, task.steps[0].id),
        )]),
        LlmResponse::text("Venue called."),
    ]);

    service(&db, provider)
        .handle_message(ChatRequest::new(1, session.id, "I called them"))
        .await
        .unwrap();

    let roles: Vec<ChatRole> = history(&db, session.id).into_iter().map(|m| m.0).collect();
    assert_eq!(
        roles,
        vec![ChatRole::User, ChatRole::Assistant, ChatRole::System]
    );
}

struct SlowProvider {
    inner: ScriptedProvider,
    delay: Duration,
}

#[async_trait]
impl LlmProvider for SlowProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn send_message(
        &self,
        config: &ProviderConfig,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.send_message(config, messages, tools, options).await
    }
}

#[tokio::test]
async fn test_writes_are_stamped_after_model_calls() {
    let db = database();
    let task = seed_task(&db, 1, "Paint", &["prime", "coat"]);
    let session = open_session(&db, 1, Some(task.id));
    let provider = Arc::new(SlowProvider {
        inner: ScriptedProvider::with_replies([
            Ok(tool_reply(vec![tool_call(
                "call_1",
                "update_steps",
                mark_done(task.id, task.steps[0].id),
            )])),
            Ok(LlmResponse::text("Primed.")),
        ]),
        delay: Duration::from_millis(30),
    });
    let service = OrchestrationService::new(db.clone(), AppConfig::default(), provider, Span::none());

    let started = Utc::now();
    service
        .handle_message(ChatRequest::new(1, session.id, "primed"))
        .await
        .unwrap();
    let after_calls = started + chrono::Duration::milliseconds(60);

    let completed_at = load_task(&db, task.id).steps[0].completed_at.unwrap();
    assert!(completed_at >= after_calls);

    let conn = db.get_connection().unwrap();
    let messages = SessionRepo::new(&conn).list_recent(session.id, 10).unwrap();
    assert!(messages.iter().all(|m| m.created_at >= after_calls));
}
