//! Storage Layer
//!
//! SQLite persistence for the task graph and conversations, plus the JSON
//! configuration file.

pub mod config;
pub mod database;
pub mod dependency_repo;
pub mod session_repo;
pub mod task_repo;

pub use config::ConfigService;
pub use database::Database;
pub use dependency_repo::DependencyRepo;
pub use session_repo::SessionRepo;
pub use task_repo::TaskRepo;
