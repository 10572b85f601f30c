use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

use super::message::ToolCall;
use super::response::FinishReason;
use crate::error::LlmError;

/// Lazily produced, single-consumer sequence of stream chunks
///
/// Dropping the stream releases the underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LlmError>> + Send>>;

/// One increment of a streamed response
///
/// A well-formed stream ends with exactly one chunk whose `done` flag is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Incremental text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Fully assembled tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Terminal marker
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped, set on the terminal chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    /// Chunk carrying incremental text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Chunk carrying completed tool calls
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::default()
        }
    }

    /// Terminal chunk
    pub fn done(finish_reason: FinishReason) -> Self {
        Self {
            done: true,
            finish_reason: Some(finish_reason),
            ..Self::default()
        }
    }
}
