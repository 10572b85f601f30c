#![allow(clippy::must_use_candidate)]

pub mod engine;
mod env;
pub mod history;
pub mod llm;
mod loader;
pub mod telemetry;
pub mod tools;

use serde::Deserialize;

pub use engine::*;
pub use history::*;
pub use llm::*;
pub use telemetry::*;
pub use tools::*;

/// Top-level Conduit configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Tool-execution endpoint configuration
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Orchestration engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Conversation history limits
    #[serde(default)]
    pub history: HistoryConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
