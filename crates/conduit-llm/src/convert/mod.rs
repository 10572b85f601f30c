//! Bidirectional conversion between the neutral wire model and vendor formats
//!
//! Each submodule builds the outbound request for one vendor, turns its
//! response into a [`ChatResponse`](crate::types::ChatResponse), and owns a
//! per-round stream state that reassembles streamed tool calls.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{FinishReason, StreamChunk, ToolArguments};

/// Per-round accumulator turning decoded vendor stream events into chunks
///
/// A fresh state is created for every stream. Tool calls are buffered until
/// the vendor closes them; [`finish`](Self::finish) flushes whatever is still
/// pending when the transport ends without a terminal event.
pub trait StreamState: Send + 'static {
    /// Decoded form of one SSE event or NDJSON line
    type Event: DeserializeOwned;

    /// Convert one event into zero or more chunks
    fn convert_event(&mut self, event: Self::Event) -> Vec<StreamChunk>;

    /// Flush buffered tool calls and emit the terminal chunk
    fn finish(&mut self) -> Vec<StreamChunk>;
}

/// Structured arguments from a JSON value, non-objects degrade to empty
pub(crate) fn object_arguments(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map,
        Value::Null => ToolArguments::new(),
        other => {
            tracing::debug!(value = %other, "tool arguments were not a JSON object");
            ToolArguments::new()
        }
    }
}

/// Identifier for a tool call the vendor did not name
pub(crate) fn synthesized_call_id(name: &str, index: usize) -> String {
    format!("call_{name}_{index}")
}

/// Promote a plain stop to `tool_calls` when the turn carried tool calls
///
/// Some vendors report `stop` even though the model is waiting on results.
pub(crate) const fn settle_finish_reason(reason: FinishReason, has_tool_calls: bool) -> FinishReason {
    match reason {
        FinishReason::Stop if has_tool_calls => FinishReason::ToolCalls,
        other => other,
    }
}
