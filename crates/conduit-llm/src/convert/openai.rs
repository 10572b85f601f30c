//! Conversion between the neutral wire model and `OpenAI` wire format

use std::collections::BTreeMap;

use super::{StreamState, settle_finish_reason};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiFunction, OpenAiFunctionCall, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk,
    OpenAiTool, OpenAiToolCall,
};
use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, StreamChunk, TokenUsage, ToolCall, ToolDefinition};

// -- Outbound --

/// Build a chat completion request
///
/// `system_prompt` is sent as a leading system message; system messages in
/// the conversation stay where they are.
pub fn build_request(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    tools: Option<&[ToolDefinition]>,
    model: &str,
    max_tokens: u32,
) -> OpenAiRequest {
    let mut wire_messages = Vec::with_capacity(messages.len() + 1);

    if let Some(prompt) = system_prompt {
        wire_messages.push(OpenAiMessage {
            role: Role::System.as_str().to_owned(),
            content: Some(prompt.to_owned()),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    wire_messages.extend(messages.iter().map(message_to_openai));

    OpenAiRequest {
        model: model.to_owned(),
        messages: wire_messages,
        max_tokens: Some(max_tokens),
        stream: None,
        tools: tools_to_openai(tools),
    }
}

fn message_to_openai(msg: &ChatMessage) -> OpenAiMessage {
    let calls = msg.tool_calls();

    let tool_calls = (!calls.is_empty()).then(|| {
        calls
            .iter()
            .map(|call| OpenAiToolCall {
                id: call.id.clone(),
                tool_type: "function".to_owned(),
                function: OpenAiFunctionCall {
                    name: call.name.clone(),
                    arguments: call.arguments_value().to_string(),
                },
            })
            .collect()
    });

    // Assistant turns that only call tools carry a null content
    let content = if tool_calls.is_some() && msg.content.is_empty() {
        None
    } else {
        Some(msg.content.clone())
    };

    OpenAiMessage {
        role: msg.role.as_str().to_owned(),
        content,
        tool_calls,
        tool_call_id: if msg.role == Role::Tool {
            msg.tool_call_id.clone()
        } else {
            None
        },
    }
}

/// Tool definitions in `OpenAI` function format, shared with Ollama
pub(crate) fn tools_to_openai(tools: Option<&[ToolDefinition]>) -> Option<Vec<OpenAiTool>> {
    tools.filter(|t| !t.is_empty()).map(|tools| {
        tools
            .iter()
            .map(|tool| OpenAiTool {
                tool_type: "function".to_owned(),
                function: OpenAiFunction {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect()
    })
}

// -- Inbound --

/// Convert a chat completion response
///
/// # Errors
///
/// Returns a provider error when the response has no choices.
pub fn into_chat_response(resp: OpenAiResponse, provider: &str) -> Result<ChatResponse, LlmError> {
    let Some(choice) = resp.choices.into_iter().next() else {
        return Err(LlmError::decode(provider, "response contained no choices"));
    };

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, ToolCall::parse_arguments(&call.function.arguments)))
        .collect();

    let finish_reason = settle_finish_reason(map_finish_reason(choice.finish_reason.as_deref()), !tool_calls.is_empty());

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason,
        usage: resp
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: resp.model,
        provider: provider.to_owned(),
    })
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::Error,
        _ => FinishReason::Stop,
    }
}

// -- Stream --

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Stream state for `OpenAI` SSE chunks
///
/// Tool-call fragments are keyed by their `index` in the delta array and
/// released together when a `finish_reason` arrives.
#[derive(Debug, Default)]
pub struct OpenAiStreamState {
    tool_calls: BTreeMap<u32, PartialToolCall>,
}

impl OpenAiStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_tool_calls(&mut self) -> Option<StreamChunk> {
        if self.tool_calls.is_empty() {
            return None;
        }

        let calls = std::mem::take(&mut self.tool_calls)
            .into_iter()
            .map(|(index, partial)| {
                let id = partial.id.unwrap_or_else(|| format!("call_{index}"));
                ToolCall::new(id, partial.name, ToolCall::parse_arguments(&partial.arguments))
            })
            .collect();

        Some(StreamChunk::tool_calls(calls))
    }
}

impl StreamState for OpenAiStreamState {
    type Event = OpenAiStreamChunk;

    fn convert_event(&mut self, event: OpenAiStreamChunk) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();

        for choice in event.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                chunks.push(StreamChunk::text(text));
            }

            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                let partial = self.tool_calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    partial.id = Some(id);
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
            }

            if let Some(reason) = choice.finish_reason {
                let flushed = self.flush_tool_calls();
                let has_tool_calls = flushed.is_some();
                chunks.extend(flushed);
                chunks.push(StreamChunk::done(settle_finish_reason(
                    map_finish_reason(Some(&reason)),
                    has_tool_calls,
                )));
            }
        }

        chunks
    }

    fn finish(&mut self) -> Vec<StreamChunk> {
        let flushed = self.flush_tool_calls();
        let reason = if flushed.is_some() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };

        flushed.into_iter().chain([StreamChunk::done(reason)]).collect()
    }
}
