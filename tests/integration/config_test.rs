//! Configuration Integration Tests
//!
//! Config file handling and application-state wiring.

use std::sync::Arc;

use taskmate::storage::{ConfigService, Database};
use taskmate::{AppError, AppState, ConfigUpdate, InboundRequest, OutboundResponse, RouterMode};
use taskmate_llm::{LlmResponse, ScriptedProvider};
use tracing::Span;

#[test]
fn test_database_path_override_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("nested").join("config.json");
    let db_path = dir.path().join("data").join("tasks.db");

    let mut service = ConfigService::with_path(config_path.clone()).unwrap();
    service
        .update_config(ConfigUpdate {
            database_path: Some(db_path.to_string_lossy().into_owned()),
            history_limit: Some(5),
            ..Default::default()
        })
        .unwrap();

    let reopened = ConfigService::with_path(config_path).unwrap();
    assert_eq!(reopened.database_path().unwrap(), db_path);
    assert_eq!(reopened.get_config().history_limit, 5);

    let db = Database::open(&reopened.database_path().unwrap()).unwrap();
    assert!(db.is_healthy());
    assert!(db_path.exists());
}

#[test]
fn test_corrupt_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(&config_path, r#"{"history_limit": 0}"#).unwrap();

    let err = ConfigService::with_path(config_path).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_state_dispatches_inbound_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigService::with_path(dir.path().join("config.json")).unwrap();
    let reply = r#"{"title": "Buy groceries", "steps": [{"title": "milk"}, {"title": "eggs"}]}"#;
    let provider = Arc::new(ScriptedProvider::with_replies([Ok(LlmResponse::text(reply))]));

    let state = AppState::new(Span::none());
    state
        .initialize(config, Database::new_in_memory().unwrap(), provider)
        .await
        .unwrap();

    let request: InboundRequest =
        serde_json::from_str(r#"{"owner_id": 3, "create_from_text": "groceries: milk, eggs"}"#)
            .unwrap();
    let response = match state.handle(request).await.unwrap() {
        OutboundResponse::Chat(response) => response,
        other => panic!("unexpected response: {:?}", other),
    };
    assert_eq!(response.agent, "task_creation");
    assert_eq!(response.created_task_ids.len(), 1);

    let request: InboundRequest =
        serde_json::from_str(r#"{"config_update": {"router_mode": "llm_fallback"}}"#).unwrap();
    let value = serde_json::to_value(state.handle(request).await.unwrap()).unwrap();
    assert_eq!(value["router_mode"], "llm_fallback");
    assert_eq!(
        state.orchestrator().await.unwrap().config().router_mode,
        RouterMode::LlmFallback
    );
}
