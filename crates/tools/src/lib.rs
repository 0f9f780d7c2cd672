//! Taskmate Tools
//!
//! Tool-calling building blocks for Taskmate agents:
//! - `catalogue` - the five task-graph tool schemas and per-role subsets
//! - `extractor` - strict decoding of tool arguments into `MutationCommand`s
//! - `Tool` trait and `ToolRegistry` - name-based lookup and dispatch
//! - `ToolResult` - execution result type
//!
//! Nothing in this crate touches storage.

pub mod catalogue;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod registry;

// Re-export core types
pub use error::{ToolError, ToolResultOf};
pub use executor::{AcknowledgingTool, ToolResult};
pub use extractor::decode;
pub use registry::{Tool, ToolRegistry};
