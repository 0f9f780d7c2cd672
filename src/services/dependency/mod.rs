//! Dependency Propagation Module
//!
//! Reacts to task and step completion by firing the matching dependency
//! edges: unlocking steps, resetting tasks to todo, or posting notices.

mod engine;

pub use engine::{DependencyEngine, PropagationReport};
