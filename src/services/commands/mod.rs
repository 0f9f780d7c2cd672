//! Command Application Module
//!
//! Applies batches of mutation commands to the task graph inside the
//! caller's transaction.

mod engine;

pub use engine::{ApplyReport, CommandEngine};
