use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ToolFailure;

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Rendered result, ready to be shown as an answer.
    pub rendered: String,
    /// Structured value, when the tool has one.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Computation runtime addressed by tool name.
#[async_trait]
pub trait ToolRuntime: Send + Sync {
    async fn run(&self, tool: &str, args: &serde_json::Value) -> Result<ToolOutput, ToolFailure>;
}
