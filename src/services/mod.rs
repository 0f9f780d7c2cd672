//! Services
//!
//! Business logic: agents and routing, command application, dependency
//! propagation and the orchestration service that composes them.

pub mod agent;
pub mod commands;
pub mod dependency;
pub mod orchestrator;

pub use agent::{Agent, AgentKind, AgentRequest, AgentResponse, KeywordRouter, Router};
pub use commands::{ApplyReport, CommandEngine};
pub use dependency::{DependencyEngine, PropagationReport};
pub use orchestrator::OrchestrationService;
