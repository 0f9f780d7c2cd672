//! Taskmate LLM
//!
//! Model endpoint abstraction for Taskmate:
//! - `LlmProvider` trait with per-call configuration
//! - OpenAI-compatible chat-completions provider (OpenAI, DeepSeek, Qwen, Ollama)
//! - `ScriptedProvider` replaying canned replies for tests and offline runs
//!
//! Also includes the HTTP client factory.

pub mod http_client;
pub mod openai;
pub mod provider;
pub mod scripted;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use scripted::{RecordedRequest, ScriptedProvider};
pub use types::*;
