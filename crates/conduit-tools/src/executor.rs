use async_trait::async_trait;
use conduit_llm::{ToolCall, ToolDefinition, ToolResult};

/// Anything that can run a batch of tool calls for the engine
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Whether tools should be offered to the model at all
    fn is_enabled(&self) -> bool;

    /// Tool definitions to advertise to the model
    async fn tools(&self) -> Vec<ToolDefinition>;

    /// Execute every call, returning one result per call in input order
    ///
    /// Must not fail as a whole; individual failures are error results.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult>;
}
