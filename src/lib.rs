//! Taskmate - Conversational Task Assistant
//!
//! This library routes chat messages to role-specific agents and applies the
//! task-graph mutations they derive. It includes:
//! - Router, tool-calling protocol and agents
//! - Command application and dependency propagation engines
//! - Storage layer (SQLite, config)
//! - Data models and utilities

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export models
pub use models::request::{
    ChatRequest, ChatResponse, ConfigureRequest, CreateTaskRequest, InboundRequest, OutboundResponse,
};
pub use models::settings::{AppConfig, ConfigUpdate, RouterMode};
pub use services::OrchestrationService;
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
