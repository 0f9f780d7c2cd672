//! Tool Executor Types
//!
//! Tool execution results and the acknowledging executor used for every
//! task-graph tool. Executors never touch storage: the real mutation comes
//! from the commands the extractor decodes out of the same arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskmate_llm::ToolDefinition;

use crate::catalogue;
use crate::extractor;
use crate::registry::Tool;

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Convert to string for model consumption
    pub fn to_content(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_default()
        } else {
            format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            )
        }
    }
}

/// Executor for a catalogue tool that only checks its arguments.
///
/// A well-formed invocation is answered with `{"success":true}` so the model
/// can phrase its follow-up reply.
#[derive(Debug, Clone)]
pub struct AcknowledgingTool {
    definition: ToolDefinition,
}

impl AcknowledgingTool {
    /// Wrap a catalogue entry; `None` for names outside the catalogue.
    pub fn for_name(name: &str) -> Option<Self> {
        catalogue::definition(name).map(|definition| Self { definition })
    }
}

#[async_trait]
impl Tool for AcknowledgingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: &str) -> ToolResult {
        match extractor::decode(&self.definition.name, arguments) {
            Ok(_) => ToolResult::ok(serde_json::json!({ "success": true }).to_string()),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}
