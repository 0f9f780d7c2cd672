//! Orchestration Service
//!
//! Composes Router, Agent, Command Application and history append into one
//! request cycle. Commands only exist once the agent has returned, so a
//! cancelled or failed request never leaves a partial mutation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use taskmate_core::Task;
use taskmate_llm::LlmProvider;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::models::request::{ChatRequest, ChatResponse, CreateTaskRequest};
use crate::models::session::{ChatRole, Session, SessionKind};
use crate::models::settings::{AppConfig, RouterMode};
use crate::services::agent::{
    Agent, AgentKind, AgentRequest, AgentResponse, ExecutorAgent, GlobalAgent, KeywordRouter,
    LlmClassifierRouter, PlannerAgent, RouteRequest, Router, SummarizerAgent,
    TaskCreationAgent, ToolCallingProtocol,
};
use crate::services::commands::{ApplyReport, CommandEngine};
use crate::services::dependency::DependencyEngine;
use crate::storage::{Database, DependencyRepo, SessionRepo, TaskRepo};
use crate::utils::error::{AppError, AppResult};

/// Request-cycle coordinator
pub struct OrchestrationService {
    database: Database,
    config: AppConfig,
    agents: HashMap<AgentKind, Arc<dyn Agent>>,
    router: Arc<dyn Router>,
    commands: CommandEngine,
    span: Span,
}

impl OrchestrationService {
    /// Build the service and its agent map.
    ///
    /// All agents share `provider`; the model configuration is chosen per
    /// request.
    pub fn new(
        database: Database,
        config: AppConfig,
        provider: Arc<dyn LlmProvider>,
        span: Span,
    ) -> Self {
        let agents = build_agents(&provider, &span);
        let router: Arc<dyn Router> = match config.router_mode {
            RouterMode::Keyword => Arc::new(KeywordRouter::new(span.clone())),
            RouterMode::LlmFallback => {
                Arc::new(LlmClassifierRouter::new(provider.clone(), span.clone()))
            }
        };
        let commands = CommandEngine::new(span.clone(), DependencyEngine::new(span.clone()));

        tracing::debug!(
            parent: &span,
            agents = agents.len(),
            router_mode = ?config.router_mode,
            "orchestration service ready"
        );

        Self {
            database,
            config,
            agents,
            router,
            commands,
            span,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open a conversation for `owner_id`.
    ///
    /// Task sessions must name a task the owner holds; global sessions must
    /// not name one.
    pub fn create_session(
        &self,
        owner_id: i64,
        kind: SessionKind,
        task_id: Option<i64>,
        title: &str,
    ) -> AppResult<Session> {
        self.database.transaction(|tx| {
            match (kind, task_id) {
                (SessionKind::Task, Some(task_id)) => {
                    TaskRepo::new(tx).get_owned_task(owner_id, task_id)?;
                }
                (SessionKind::Task, None) => {
                    return Err(AppError::validation("task session requires a task_id"));
                }
                (SessionKind::Global, Some(_)) => {
                    return Err(AppError::validation("global session cannot bind a task"));
                }
                (SessionKind::Global, None) => {}
            }
            SessionRepo::new(tx).create_session(owner_id, kind, task_id, title, Utc::now())
        })
    }

    /// Handle one chat message end to end
    pub async fn handle_message(&self, request: ChatRequest) -> AppResult<ChatResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            parent: &self.span,
            "chat_request",
            request_id = %request_id,
            owner_id = request.owner_id,
            session_id = request.session_id,
        );
        self.chat_cycle(request_id, request)
            .instrument(span)
            .await
    }

    /// Turn free text into a new task owned by the caller
    pub async fn create_task_from_text(
        &self,
        request: CreateTaskRequest,
    ) -> AppResult<ChatResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            parent: &self.span,
            "create_task_request",
            request_id = %request_id,
            owner_id = request.owner_id,
        );
        self.create_cycle(request_id, request)
            .instrument(span)
            .await
    }

    async fn chat_cycle(&self, request_id: String, request: ChatRequest) -> AppResult<ChatResponse> {
        if request.input.trim().is_empty() {
            return Err(AppError::validation("input cannot be empty"));
        }

        let cancel = request.cancel.as_ref();
        let (session, mut agent_request) = self.load_context(&request, Utc::now())?;

        let kind = {
            let route = RouteRequest {
                session_kind: session.kind,
                has_task: agent_request.task.is_some(),
                text: &request.input,
                provider: &agent_request.provider,
            };
            until_cancelled(cancel, async {
                Ok::<_, AppError>(self.router.route(&route).await)
            })
            .await?
        };
        // The classifier may send a task session to the global agent.
        if kind == AgentKind::Global {
            agent_request.open_tasks = self.open_tasks(request.owner_id)?;
        }
        let agent = self.agent(kind)?;
        tracing::info!(agent = agent.name(), "routed");

        let response = until_cancelled(cancel, agent.handle(&agent_request)).await?;
        ensure_not_cancelled(cancel)?;

        // Turn messages precede any system notice the commands append.
        let written_at = Utc::now();
        let report = self.database.transaction(|tx| {
            let sessions = SessionRepo::new(tx);
            sessions.append_message(
                session.id,
                ChatRole::User,
                &request.input,
                None,
                written_at,
            )?;
            sessions.append_message(
                session.id,
                ChatRole::Assistant,
                &response.assistant_message,
                Some(agent.name()),
                written_at,
            )?;
            self.commands
                .apply(tx, request.owner_id, &response.commands, written_at)
        })?;

        tracing::info!(
            agent = agent.name(),
            commands = report.applied,
            "chat request complete"
        );
        Ok(to_response(request_id, agent.as_ref(), response, report))
    }

    async fn create_cycle(
        &self,
        request_id: String,
        request: CreateTaskRequest,
    ) -> AppResult<ChatResponse> {
        if request.text.trim().is_empty() {
            return Err(AppError::validation("text cannot be empty"));
        }

        let cancel = request.cancel.as_ref();
        let provider = self.config.resolve_provider(request.provider.as_ref());
        let agent_request = AgentRequest::bare(request.owner_id, request.text.as_str(), provider);

        let agent = self.agent(AgentKind::TaskCreation)?;
        let response = until_cancelled(cancel, agent.handle(&agent_request)).await?;
        ensure_not_cancelled(cancel)?;

        let written_at = Utc::now();
        let report = self.database.transaction(|tx| {
            self.commands
                .apply(tx, request.owner_id, &response.commands, written_at)
        })?;

        tracing::info!(created = ?report.created_task_ids, "task created from text");
        Ok(to_response(request_id, agent.as_ref(), response, report))
    }

    /// Session, bound task, edges and history for one chat turn.
    ///
    /// The open-task overview is left empty until routing picks the global
    /// agent.
    fn load_context(
        &self,
        request: &ChatRequest,
        now: DateTime<Utc>,
    ) -> AppResult<(Session, AgentRequest)> {
        let conn = self.database.get_connection()?;
        let sessions = SessionRepo::new(&conn);
        let tasks = TaskRepo::new(&conn);

        let session = sessions
            .get_session(request.session_id)?
            .ok_or_else(|| AppError::not_found(format!("session {}", request.session_id)))?;
        if session.owner_id != request.owner_id {
            return Err(AppError::forbidden(format!(
                "session {} belongs to another owner",
                session.id
            )));
        }

        let task = match session.task_id {
            Some(task_id) => Some(tasks.get_owned_task(request.owner_id, task_id)?),
            None => None,
        };
        let dependencies = match &task {
            Some(task) => DependencyRepo::new(&conn).list_for_task(task.id)?,
            None => Vec::new(),
        };
        let history = sessions.list_recent(session.id, self.config.history_limit)?;

        tracing::debug!(
            has_task = task.is_some(),
            dependencies = dependencies.len(),
            history = history.len(),
            "context loaded"
        );

        let agent_request = AgentRequest {
            owner_id: request.owner_id,
            session_kind: session.kind,
            task,
            dependencies,
            open_tasks: Vec::new(),
            history,
            input: request.input.clone(),
            now,
            provider: self.config.resolve_provider(request.provider.as_ref()),
        };
        Ok((session, agent_request))
    }

    fn open_tasks(&self, owner_id: i64) -> AppResult<Vec<Task>> {
        let conn = self.database.get_connection()?;
        let open_tasks = TaskRepo::new(&conn).list_open_tasks(owner_id)?;
        tracing::debug!(open_tasks = open_tasks.len(), "overview loaded");
        Ok(open_tasks)
    }

    fn agent(&self, kind: AgentKind) -> AppResult<Arc<dyn Agent>> {
        self.agents
            .get(&kind)
            .cloned()
            .ok_or_else(|| AppError::internal(format!("no agent registered for {}", kind)))
    }
}

impl std::fmt::Debug for OrchestrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut agents: Vec<&str> = self.agents.keys().map(AgentKind::as_str).collect();
        agents.sort_unstable();
        f.debug_struct("OrchestrationService")
            .field("agents", &agents)
            .field("router_mode", &self.config.router_mode)
            .finish()
    }
}

fn build_agents(
    provider: &Arc<dyn LlmProvider>,
    span: &Span,
) -> HashMap<AgentKind, Arc<dyn Agent>> {
    let protocol = || ToolCallingProtocol::new(provider.clone(), span.clone());
    let agents: Vec<Arc<dyn Agent>> = vec![
        Arc::new(ExecutorAgent::new(protocol(), span.clone())),
        Arc::new(PlannerAgent::new(protocol(), span.clone())),
        Arc::new(GlobalAgent::new(protocol(), span.clone())),
        Arc::new(SummarizerAgent::new(provider.clone(), span.clone())),
        Arc::new(TaskCreationAgent::new(provider.clone(), span.clone())),
    ];
    agents.into_iter().map(|agent| (agent.kind(), agent)).collect()
}

/// Await `fut` unless `cancel` fires first
async fn until_cancelled<T, F>(cancel: Option<&CancellationToken>, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(AppError::Cancelled),
            result = fut => result,
        },
        None => fut.await,
    }
}

fn ensure_not_cancelled(cancel: Option<&CancellationToken>) -> AppResult<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(AppError::Cancelled),
        _ => Ok(()),
    }
}

fn to_response(
    request_id: String,
    agent: &dyn Agent,
    response: AgentResponse,
    report: ApplyReport,
) -> ChatResponse {
    ChatResponse {
        request_id,
        agent: agent.name().to_string(),
        assistant_message: response.assistant_message,
        applied_commands: response.commands,
        created_task_ids: report.created_task_ids,
    }
}
