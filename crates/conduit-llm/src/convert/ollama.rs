//! Conversion between the neutral wire model and Ollama wire format

use super::openai::tools_to_openai;
use super::{StreamState, object_arguments, synthesized_call_id};
use crate::protocol::ollama::{OllamaFunctionCall, OllamaMessage, OllamaOptions, OllamaRequest, OllamaResponse, OllamaToolCall};
use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, StreamChunk, TokenUsage, ToolCall, ToolDefinition};

// -- Outbound --

/// Build an `/api/chat` request
pub fn build_request(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    tools: Option<&[ToolDefinition]>,
    model: &str,
    max_tokens: u32,
    stream: bool,
) -> OllamaRequest {
    let mut wire_messages = Vec::with_capacity(messages.len() + 1);

    if let Some(prompt) = system_prompt {
        wire_messages.push(OllamaMessage {
            role: Role::System.as_str().to_owned(),
            content: prompt.to_owned(),
            ..OllamaMessage::default()
        });
    }
    wire_messages.extend(messages.iter().map(message_to_ollama));

    OllamaRequest {
        model: model.to_owned(),
        messages: wire_messages,
        stream,
        tools: tools_to_openai(tools),
        options: Some(OllamaOptions {
            num_predict: Some(max_tokens),
        }),
    }
}

fn message_to_ollama(msg: &ChatMessage) -> OllamaMessage {
    let calls = msg.tool_calls();
    let is_tool = msg.role == Role::Tool;

    OllamaMessage {
        role: msg.role.as_str().to_owned(),
        content: msg.content.clone(),
        tool_calls: (!calls.is_empty()).then(|| {
            calls
                .iter()
                .map(|call| OllamaToolCall {
                    id: Some(call.id.clone()),
                    function: OllamaFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments_value(),
                    },
                })
                .collect()
        }),
        tool_call_id: msg.tool_call_id.clone().filter(|_| is_tool),
        tool_name: msg.name.clone().filter(|_| is_tool),
    }
}

// -- Inbound --

/// Convert a non-streaming `/api/chat` response
pub fn into_chat_response(resp: OllamaResponse, provider: &str) -> ChatResponse {
    let tool_calls = convert_tool_calls(resp.message.tool_calls.unwrap_or_default(), 0);
    let finish_reason = map_finish_reason(resp.done_reason.as_deref(), !tool_calls.is_empty());

    let usage = (resp.prompt_eval_count.is_some() || resp.eval_count.is_some()).then(|| {
        TokenUsage::new(
            resp.prompt_eval_count.unwrap_or_default(),
            resp.eval_count.unwrap_or_default(),
        )
    });

    ChatResponse {
        content: resp.message.content,
        tool_calls,
        finish_reason,
        usage,
        model: resp.model,
        provider: provider.to_owned(),
    }
}

fn convert_tool_calls(calls: Vec<OllamaToolCall>, offset: usize) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(i, call)| {
            let id = call
                .id
                .unwrap_or_else(|| synthesized_call_id(&call.function.name, offset + i));
            ToolCall::new(id, call.function.name, object_arguments(call.function.arguments))
        })
        .collect()
}

fn map_finish_reason(done_reason: Option<&str>, has_tool_calls: bool) -> FinishReason {
    if has_tool_calls {
        FinishReason::ToolCalls
    } else if done_reason == Some("length") {
        FinishReason::Length
    } else {
        FinishReason::Stop
    }
}

// -- Stream --

/// Stream state for Ollama NDJSON lines
///
/// Ollama sends each tool call whole in one line; calls are buffered until
/// the `done` line.
#[derive(Debug, Default)]
pub struct OllamaStreamState {
    tool_calls: Vec<ToolCall>,
    /// `done_reason` of the terminal line
    done_reason: Option<String>,
}

impl OllamaStreamState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamState for OllamaStreamState {
    type Event = OllamaResponse;

    fn convert_event(&mut self, event: OllamaResponse) -> Vec<StreamChunk> {
        if let Some(error) = event.error {
            tracing::warn!(error = %error, "ollama stream reported error");
            return vec![StreamChunk::done(FinishReason::Error)];
        }

        let mut chunks = Vec::new();

        if !event.message.content.is_empty() {
            chunks.push(StreamChunk::text(event.message.content));
        }

        if let Some(calls) = event.message.tool_calls {
            let offset = self.tool_calls.len();
            self.tool_calls.extend(convert_tool_calls(calls, offset));
        }

        if event.done {
            self.done_reason = event.done_reason;
            chunks.extend(self.finish());
        }

        chunks
    }

    fn finish(&mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::with_capacity(2);
        let has_tool_calls = !self.tool_calls.is_empty();
        if has_tool_calls {
            chunks.push(StreamChunk::tool_calls(std::mem::take(&mut self.tool_calls)));
        }
        let done_reason = self.done_reason.take();
        chunks.push(StreamChunk::done(map_finish_reason(done_reason.as_deref(), has_tool_calls)));
        chunks
    }
}
