//! Orchestration Module
//!
//! One request cycle: route, run the agent, then apply its commands and
//! record the exchange in a single transaction.

mod service;

pub use service::OrchestrationService;
