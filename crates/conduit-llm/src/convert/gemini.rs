//! Conversion between the neutral wire model and Gemini wire format
//!
//! Gemini has no system role: system text is folded into the first user
//! turn as a `[System]: ` part. Tool schemas are simplified to the subset
//! Gemini accepts, with upper-cased type names.

use serde_json::{Map, Value};

use super::{StreamState, object_arguments, settle_finish_reason, synthesized_call_id};
use crate::protocol::gemini::{
    GeminiContent, GeminiFunctionCall, GeminiFunctionDeclaration, GeminiFunctionResponse, GeminiGenerationConfig,
    GeminiPart, GeminiRequest, GeminiResponse, GeminiTool,
};
use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, StreamChunk, TokenUsage, ToolCall, ToolDefinition};

const SYSTEM_PREFIX: &str = "[System]: ";

/// Schema keys Gemini understands; everything else is dropped
const SCHEMA_KEYS: [&str; 6] = ["type", "properties", "required", "items", "enum", "description"];

// -- Outbound --

/// Build a `generateContent` request
///
/// As with Anthropic, the last system message wins over `system_prompt`.
pub fn build_request(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    tools: Option<&[ToolDefinition]>,
    max_tokens: u32,
) -> GeminiRequest {
    let mut system = system_prompt;
    let mut contents: Vec<GeminiContent> = Vec::with_capacity(messages.len() + 1);

    for msg in messages {
        match msg.role {
            Role::System => system = Some(msg.content.as_str()),
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![GeminiPart::Text(msg.content.clone())],
            }),
            Role::Assistant => contents.push(assistant_content(msg)),
            Role::Tool => {
                let part = GeminiPart::FunctionResponse(GeminiFunctionResponse {
                    id: msg.tool_call_id.clone(),
                    name: msg.name.clone().unwrap_or_else(|| "unknown".to_owned()),
                    response: serde_json::json!({ "result": msg.content }),
                });

                // Responses to parallel calls go back in a single turn
                match contents.last_mut() {
                    Some(last) if last.role.as_deref() == Some("function") => last.parts.push(part),
                    _ => contents.push(GeminiContent {
                        role: Some("function".to_owned()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    if let Some(system_text) = system.filter(|s| !s.is_empty()) {
        fold_system_text(&mut contents, system_text);
    }

    GeminiRequest {
        contents,
        generation_config: Some(GeminiGenerationConfig {
            max_output_tokens: Some(max_tokens),
        }),
        tools: tools.filter(|t| !t.is_empty()).map(|tools| {
            vec![GeminiTool {
                function_declarations: tools.iter().map(tool_to_gemini).collect(),
            }]
        }),
    }
}

fn assistant_content(msg: &ChatMessage) -> GeminiContent {
    let mut parts = Vec::with_capacity(msg.tool_calls().len() + 1);
    if !msg.content.is_empty() || msg.tool_calls().is_empty() {
        parts.push(GeminiPart::Text(msg.content.clone()));
    }
    parts.extend(msg.tool_calls().iter().map(|call| {
        GeminiPart::FunctionCall(GeminiFunctionCall {
            id: Some(call.id.clone()),
            name: call.name.clone(),
            args: call.arguments_value(),
        })
    }));

    GeminiContent {
        role: Some("model".to_owned()),
        parts,
    }
}

/// Prefix the first user turn with the system text, creating one if needed
fn fold_system_text(contents: &mut Vec<GeminiContent>, system_text: &str) {
    let part = GeminiPart::Text(format!("{SYSTEM_PREFIX}{system_text}"));

    match contents.iter_mut().find(|c| c.role.as_deref() == Some("user")) {
        Some(first_user) => first_user.parts.insert(0, part),
        None => contents.insert(
            0,
            GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![part],
            },
        ),
    }
}

fn tool_to_gemini(tool: &ToolDefinition) -> GeminiFunctionDeclaration {
    GeminiFunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: simplify_schema(&tool.parameters),
    }
}

/// Reduce a JSON Schema to the subset Gemini accepts
///
/// Keeps `type` (upper-cased), `properties`, `required`, `items`, `enum` and
/// `description`. Unknown keys such as `oneOf` or `additionalProperties` are
/// dropped rather than rejected.
pub fn simplify_schema(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };

    let mut simplified = Map::new();
    for (key, value) in map {
        match key.as_str() {
            "type" => {
                if let Some(type_name) = schema_type_name(value) {
                    simplified.insert(key.clone(), Value::String(type_name));
                }
            }
            "properties" => {
                let properties = value
                    .as_object()
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), simplify_schema(prop)))
                            .collect::<Map<_, _>>()
                    })
                    .unwrap_or_default();
                simplified.insert(key.clone(), Value::Object(properties));
            }
            "items" => {
                simplified.insert(key.clone(), simplify_schema(value));
            }
            _ if SCHEMA_KEYS.contains(&key.as_str()) => {
                simplified.insert(key.clone(), value.clone());
            }
            _ => tracing::debug!(key = %key, "dropping schema key unsupported by gemini"),
        }
    }

    Value::Object(simplified)
}

/// Upper-cased type name; for a type union the first non-null member wins
fn schema_type_name(value: &Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name.to_uppercase()),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null")
            .map(str::to_uppercase),
        _ => None,
    }
}

// -- Inbound --

/// Convert a `generateContent` response
///
/// `model` is reported when the response carries no `modelVersion`.
pub fn into_chat_response(resp: GeminiResponse, provider: &str, model: &str) -> ChatResponse {
    let usage = resp
        .usage_metadata
        .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count));
    let model = resp.model_version.unwrap_or_else(|| model.to_owned());

    let Some(candidate) = resp.candidates.into_iter().next() else {
        tracing::warn!(provider, "gemini response contained no candidates");
        return ChatResponse {
            content: String::new(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Error,
            usage,
            model,
            provider: provider.to_owned(),
        };
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.parts {
        match part {
            GeminiPart::Text(text) => content.push_str(&text),
            GeminiPart::FunctionCall(call) => tool_calls.push(function_call_to_tool_call(call, tool_calls.len())),
            GeminiPart::FunctionResponse(_) | GeminiPart::Other => {}
        }
    }

    let finish_reason = map_finish_reason(candidate.finish_reason.as_deref(), !tool_calls.is_empty());

    ChatResponse {
        content,
        tool_calls,
        finish_reason,
        usage,
        model,
        provider: provider.to_owned(),
    }
}

fn function_call_to_tool_call(call: GeminiFunctionCall, index: usize) -> ToolCall {
    let id = call.id.unwrap_or_else(|| synthesized_call_id(&call.name, index));
    ToolCall::new(id, call.name, object_arguments(call.args))
}

fn map_finish_reason(reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    let reason = match reason {
        Some("MAX_TOKENS") => FinishReason::Length,
        Some(
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" | "MALFORMED_FUNCTION_CALL",
        ) => FinishReason::Error,
        _ => FinishReason::Stop,
    };
    settle_finish_reason(reason, has_tool_calls)
}

// -- Stream --

/// Stream state for Gemini `streamGenerateContent` SSE chunks
///
/// Gemini delivers function calls whole; they are held back until the
/// candidate reports a finish reason.
#[derive(Debug, Default)]
pub struct GeminiStreamState {
    tool_calls: Vec<ToolCall>,
    saw_tool_call: bool,
}

impl GeminiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_tool_calls(&mut self) -> Option<StreamChunk> {
        if self.tool_calls.is_empty() {
            return None;
        }
        Some(StreamChunk::tool_calls(std::mem::take(&mut self.tool_calls)))
    }
}

impl StreamState for GeminiStreamState {
    type Event = GeminiResponse;

    fn convert_event(&mut self, event: GeminiResponse) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();

        let Some(candidate) = event.candidates.into_iter().next() else {
            return chunks;
        };

        let mut text = String::new();
        for part in candidate.content.parts {
            match part {
                GeminiPart::Text(fragment) => text.push_str(&fragment),
                GeminiPart::FunctionCall(call) => {
                    let index = self.tool_calls.len();
                    self.tool_calls.push(function_call_to_tool_call(call, index));
                    self.saw_tool_call = true;
                }
                GeminiPart::FunctionResponse(_) | GeminiPart::Other => {}
            }
        }
        if !text.is_empty() {
            chunks.push(StreamChunk::text(text));
        }

        if let Some(reason) = candidate.finish_reason {
            chunks.extend(self.flush_tool_calls());
            chunks.push(StreamChunk::done(map_finish_reason(Some(&reason), self.saw_tool_call)));
        }

        chunks
    }

    fn finish(&mut self) -> Vec<StreamChunk> {
        let mut chunks: Vec<StreamChunk> = self.flush_tool_calls().into_iter().collect();
        chunks.push(StreamChunk::done(map_finish_reason(None, self.saw_tool_call)));
        chunks
    }
}
