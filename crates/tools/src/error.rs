//! Tool Error Types

use thiserror::Error;

/// Errors raised while resolving or decoding a tool invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The model asked for a tool that is not in the offered catalogue.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// The invocation's arguments do not match the tool's schema.
    #[error("Failed to decode {tool} arguments: {message}")]
    Decode { tool: String, message: String },
}

impl ToolError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn decode(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for tool operations
pub type ToolResultOf<T> = Result<T, ToolError>;
