//! Tool Trait and Registry
//!
//! Defines the `Tool` trait and a `ToolRegistry` for name-based lookup,
//! deterministic definition listing and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use taskmate_llm::ToolDefinition;

use crate::error::{ToolError, ToolResultOf};
use crate::executor::{AcknowledgingTool, ToolResult};

/// A tool the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and argument schema offered to the model.
    fn definition(&self) -> &ToolDefinition;

    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Run the tool against the invocation's raw JSON arguments.
    async fn execute(&self, arguments: &str) -> ToolResult;
}

/// Registry of available tools.
///
/// Iteration follows registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of acknowledging executors for the given catalogue names.
    ///
    /// Names outside the catalogue are skipped.
    pub fn from_catalogue(names: &[&str]) -> Self {
        let mut registry = Self::new();
        for name in names {
            if let Some(tool) = AcknowledgingTool::for_name(name) {
                registry.register(Arc::new(tool));
            }
        }
        registry
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Look up a tool by name, failing for names that were never offered.
    pub fn resolve(&self, name: &str) -> ToolResultOf<Arc<dyn Tool>> {
        self.get(name).ok_or_else(|| ToolError::unknown(name))
    }

    /// All tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition().clone())
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}
