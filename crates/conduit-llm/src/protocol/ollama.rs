//! Ollama `/api/chat` wire format types
//!
//! Messages follow the `OpenAI` chat shape, except tool-call arguments are
//! JSON objects rather than encoded strings and streaming is NDJSON.

use serde::{Deserialize, Serialize};

// -- Request types --

/// Ollama chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaRequest {
    /// Model tag, e.g. `llama3.1:8b`
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OllamaMessage>,
    /// Whether to stream NDJSON chunks
    pub stream: bool,
    /// Tool definitions (`OpenAI` function format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<crate::protocol::openai::OpenAiTool>>,
    /// Sampling options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// Runtime options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Maximum tokens to predict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// Ollama chat message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Message role
    pub role: String,
    /// Text content
    #[serde(default)]
    pub content: String,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OllamaToolCall>>,
    /// Tool call ID this message responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name for tool results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// Ollama tool call, delivered whole rather than in fragments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaToolCall {
    /// Call identifier (recent server versions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function call details
    pub function: OllamaFunctionCall,
}

/// Function call details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

// -- Response types --

/// Ollama chat response, also the shape of each NDJSON stream line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaResponse {
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Generated message (partial when streaming)
    #[serde(default)]
    pub message: OllamaMessage,
    /// Whether generation finished
    #[serde(default)]
    pub done: bool,
    /// Why generation finished
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Prompt tokens evaluated
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    /// Tokens generated
    #[serde(default)]
    pub eval_count: Option<u32>,
    /// Error reported mid-stream
    #[serde(default)]
    pub error: Option<String>,
}

// -- Model list types --

/// `GET /api/tags` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaTagList {
    /// Locally available models
    #[serde(default)]
    pub models: Vec<OllamaModelTag>,
}

/// Locally available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaModelTag {
    /// Model tag, e.g. `llama3.1:8b`
    pub name: String,
}
