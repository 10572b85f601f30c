//! LLM provider layer for Conduit
//!
//! A vendor-neutral wire model, per-vendor translators and providers
//! (Anthropic, `OpenAI`, Gemini, Ollama), and a registry that caches
//! provider instances and selects a healthy one by fallback order.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod types;

pub use conduit_config::ProviderKind;
pub use error::LlmError;
pub use provider::{Provider, ProviderCapabilities, ProviderSettings};
pub use registry::{HttpProviderFactory, ProviderFactory, ProviderOverrides, ProviderRegistry};
pub use types::{
    ChatMessage, ChatResponse, ChunkStream, FinishReason, Role, StreamChunk, TokenUsage, ToolArguments, ToolCall,
    ToolDefinition, ToolResult,
};
