//! Vendor-neutral wire model
//!
//! Every provider translates its own request and response shapes to and
//! from these types, so the engine and the tool gateway never see vendor JSON.

pub mod message;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{ChatMessage, Role, ToolArguments, ToolCall, ToolResult};
pub use response::{ChatResponse, FinishReason, TokenUsage};
pub use stream::{ChunkStream, StreamChunk};
pub use tool::ToolDefinition;
