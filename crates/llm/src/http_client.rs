//! HTTP Client Factory
//!
//! Builds the shared `reqwest` client used by chat-completions providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Default request timeout for one model call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build a `reqwest::Client` with the given request timeout.
///
/// Proxy settings come from the standard environment variables, which is
/// reqwest's default behavior.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}
