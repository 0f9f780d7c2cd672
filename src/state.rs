//! Application State
//!
//! Shared state holding the configuration service and the orchestration
//! service built from it.

use std::sync::Arc;

use taskmate_llm::LlmProvider;
use tokio::sync::RwLock;
use tracing::Span;

use crate::models::request::{InboundRequest, OutboundResponse};
use crate::models::settings::{AppConfig, ConfigUpdate};
use crate::services::orchestrator::OrchestrationService;
use crate::storage::{ConfigService, Database};
use crate::utils::error::{AppError, AppResult};

/// Services that exist once initialization has run
struct Runtime {
    database: Database,
    provider: Arc<dyn LlmProvider>,
    orchestrator: Arc<OrchestrationService>,
}

/// Application state
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// Database, model provider and orchestration service
    runtime: Arc<RwLock<Option<Runtime>>>,
    span: Span,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new(span: Span) -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            runtime: Arc::new(RwLock::new(None)),
            span,
        }
    }

    /// Build the runtime from an opened config service and database.
    ///
    /// A second call is a no-op.
    pub async fn initialize(
        &self,
        config: ConfigService,
        database: Database,
        provider: Arc<dyn LlmProvider>,
    ) -> AppResult<()> {
        let mut runtime_lock = self.runtime.write().await;
        if runtime_lock.is_some() {
            return Ok(());
        }

        let orchestrator = Arc::new(OrchestrationService::new(
            database.clone(),
            config.get_config_clone(),
            provider.clone(),
            self.span.clone(),
        ));
        *runtime_lock = Some(Runtime {
            database,
            provider,
            orchestrator,
        });

        let mut config_lock = self.config.write().await;
        *config_lock = Some(config);

        tracing::info!(parent: &self.span, "application state initialized");
        Ok(())
    }

    /// Database reachable and configuration valid.
    ///
    /// False until `initialize` has run.
    pub async fn is_healthy(&self) -> bool {
        let database_ok = match &*self.runtime.read().await {
            Some(runtime) => runtime.database.is_healthy(),
            None => false,
        };
        let config_ok = match &*self.config.read().await {
            Some(config) => config.is_healthy(),
            None => false,
        };
        database_ok && config_ok
    }

    /// Persist a config update and rebuild the orchestration service with it.
    ///
    /// Requests already in flight finish with the previous configuration.
    pub async fn update_config(&self, update: ConfigUpdate) -> AppResult<AppConfig> {
        let updated = {
            let mut guard = self.config.write().await;
            match &mut *guard {
                Some(config) => config.update_config(update)?,
                None => return Err(AppError::config("Config service not initialized")),
            }
        };

        let mut guard = self.runtime.write().await;
        if let Some(runtime) = guard.as_mut() {
            runtime.orchestrator = Arc::new(OrchestrationService::new(
                runtime.database.clone(),
                updated.clone(),
                runtime.provider.clone(),
                self.span.clone(),
            ));
        }
        Ok(updated)
    }

    /// The current orchestration service
    pub async fn orchestrator(&self) -> AppResult<Arc<OrchestrationService>> {
        let guard = self.runtime.read().await;
        match &*guard {
            Some(runtime) => Ok(runtime.orchestrator.clone()),
            None => Err(AppError::internal("Application state not initialized")),
        }
    }

    /// Dispatch one inbound request
    pub async fn handle(&self, request: InboundRequest) -> AppResult<OutboundResponse> {
        let orchestrator = self.orchestrator().await?;
        match request {
            InboundRequest::Chat(request) => orchestrator
                .handle_message(request)
                .await
                .map(OutboundResponse::Chat),
            InboundRequest::CreateTask(request) => orchestrator
                .create_task_from_text(request)
                .await
                .map(OutboundResponse::Chat),
            InboundRequest::Configure(request) => self
                .update_config(request.config_update)
                .await
                .map(OutboundResponse::Config),
        }
    }
}
