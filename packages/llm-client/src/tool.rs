//! Tool-calling types.
//!
//! The gateway drives the loop; the caller resolves each requested call
//! through a [`ToolExecutor`]. No shared mutable state crosses tool
//! resolutions — the transcript is rebuilt and re-submitted each round.

use async_trait::async_trait;
use serde::Serialize;

/// Definition of a tool offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A single tool call requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Provider-assigned call id (echoed back with the result).
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Error raised while resolving a tool call. Aborts the loop.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

/// Caller-supplied resolver for tool calls.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError>;
}

/// One resolved tool call, kept for the caller's decision logic.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
    pub result: serde_json::Value,
}

/// Outcome of a tool-augmented completion.
#[derive(Debug, Clone)]
pub struct ToolTranscript {
    /// The model's final tool-free message.
    pub content: String,
    /// Every tool call resolved during the loop, in order.
    pub invocations: Vec<ToolInvocation>,
    /// Number of model round-trips made.
    pub iterations: usize,
    pub usage: crate::types::Usage,
}

impl ToolTranscript {
    /// True if any invocation of the named tool was made.
    pub fn called(&self, tool_name: &str) -> bool {
        self.invocations.iter().any(|i| i.name == tool_name)
    }

    /// All invocations of the named tool.
    pub fn invocations_of(&self, tool_name: &str) -> Vec<&ToolInvocation> {
        self.invocations
            .iter()
            .filter(|i| i.name == tool_name)
            .collect()
    }
}
