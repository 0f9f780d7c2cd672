//! Settings Models
//!
//! Application configuration and settings data structures.

use serde::{Deserialize, Serialize};
use taskmate_llm::ProviderConfig;

/// Environment variable holding the model endpoint API key
pub const API_KEY_ENV: &str = "TASKMATE_API_KEY";

/// How the router resolves messages that match no keyword class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouterMode {
    /// Unmatched messages go to the executor
    #[default]
    Keyword,
    /// Unmatched messages are classified by the model
    LlmFallback,
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database file override; defaults to ~/.taskmate/taskmate.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    /// Number of recent conversation messages given to agents
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default)]
    pub router_mode: RouterMode,
    /// tracing filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default model endpoint; requests may carry their own
    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_history_limit() -> u32 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            history_limit: default_history_limit(),
            router_mode: RouterMode::default(),
            log_level: default_log_level(),
            provider: ProviderConfig::default(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    pub database_path: Option<String>,
    pub history_limit: Option<u32>,
    pub router_mode: Option<RouterMode>,
    pub log_level: Option<String>,
    pub provider: Option<ProviderConfig>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(path) = update.database_path {
            self.database_path = Some(path);
        }
        if let Some(limit) = update.history_limit {
            self.history_limit = limit;
        }
        if let Some(mode) = update.router_mode {
            self.router_mode = mode;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
        if let Some(provider) = update.provider {
            self.provider = provider;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=200).contains(&self.history_limit) {
            return Err(format!(
                "history_limit must be between 1 and 200, got {}",
                self.history_limit
            ));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.log_level.as_str()) {
            return Err(format!("Invalid log_level: {}", self.log_level));
        }

        if self.provider.model.trim().is_empty() {
            return Err("provider.model cannot be empty".to_string());
        }

        if !self.provider.base_url.starts_with("http://")
            && !self.provider.base_url.starts_with("https://")
        {
            return Err(format!(
                "provider.base_url must be an http(s) URL, got {}",
                self.provider.base_url
            ));
        }

        if let Some(path) = &self.database_path {
            if path.trim().is_empty() {
                return Err("database_path cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Effective provider for one request.
    ///
    /// A request-supplied config wins over the stored default. A missing API
    /// key is filled from `TASKMATE_API_KEY`.
    pub fn resolve_provider(&self, request: Option<&ProviderConfig>) -> ProviderConfig {
        let mut provider = request.cloned().unwrap_or_else(|| self.provider.clone());
        if provider.api_key.is_none() {
            provider.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        provider
    }
}
