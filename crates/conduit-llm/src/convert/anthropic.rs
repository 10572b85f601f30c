//! Conversion between the neutral wire model and Anthropic wire format

use super::{StreamState, object_arguments, settle_finish_reason};
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool,
};
use crate::types::{ChatMessage, ChatResponse, FinishReason, Role, StreamChunk, TokenUsage, ToolCall, ToolDefinition};

// -- Outbound --

/// Build a Messages API request
///
/// System messages are lifted into the top-level `system` field; the last
/// one wins over `system_prompt`.
pub fn build_request(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    tools: Option<&[ToolDefinition]>,
    model: &str,
    max_tokens: u32,
) -> AnthropicRequest {
    let mut system = system_prompt.map(ToOwned::to_owned);
    let mut wire_messages: Vec<AnthropicMessage> = Vec::with_capacity(messages.len());

    for msg in messages {
        if msg.role == Role::System {
            system = Some(msg.content.clone());
            continue;
        }

        let converted = message_to_anthropic(msg);

        // Consecutive tool results must travel in one user turn
        if let Some(previous) = wire_messages.last_mut()
            && is_tool_result_turn(previous)
            && is_tool_result_turn(&converted)
            && let (AnthropicContent::Blocks(existing), AnthropicContent::Blocks(more)) =
                (&mut previous.content, converted.content.clone())
        {
            existing.extend(more);
            continue;
        }

        wire_messages.push(converted);
    }

    AnthropicRequest {
        model: model.to_owned(),
        max_tokens,
        system,
        messages: wire_messages,
        stream: None,
        tools: tools.filter(|t| !t.is_empty()).map(|t| t.iter().map(tool_to_anthropic).collect()),
    }
}

fn is_tool_result_turn(msg: &AnthropicMessage) -> bool {
    matches!(&msg.content, AnthropicContent::Blocks(blocks)
        if !blocks.is_empty() && blocks.iter().all(|b| matches!(b, AnthropicContentBlock::ToolResult { .. })))
}

fn message_to_anthropic(msg: &ChatMessage) -> AnthropicMessage {
    if msg.role == Role::Tool
        && let Some(tool_call_id) = &msg.tool_call_id
    {
        return AnthropicMessage {
            role: "user".to_owned(),
            content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: msg.content.clone(),
                is_error: None,
            }]),
        };
    }

    let role = if msg.role == Role::Assistant { "assistant" } else { "user" };

    if msg.role == Role::Assistant && !msg.tool_calls().is_empty() {
        let mut blocks = Vec::with_capacity(msg.tool_calls().len() + 1);
        if !msg.content.is_empty() {
            blocks.push(AnthropicContentBlock::Text {
                text: msg.content.clone(),
            });
        }
        blocks.extend(msg.tool_calls().iter().map(|call| AnthropicContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments_value(),
        }));

        return AnthropicMessage {
            role: role.to_owned(),
            content: AnthropicContent::Blocks(blocks),
        };
    }

    AnthropicMessage {
        role: role.to_owned(),
        content: AnthropicContent::Text(msg.content.clone()),
    }
}

fn tool_to_anthropic(tool: &ToolDefinition) -> AnthropicTool {
    AnthropicTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.parameters.clone(),
    }
}

// -- Inbound --

/// Convert a Messages API response
pub fn into_chat_response(resp: AnthropicResponse, provider: &str) -> ChatResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            AnthropicResponseBlock::Text { text } => content.push_str(&text),
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, object_arguments(input)));
            }
            AnthropicResponseBlock::Other => {}
        }
    }

    let finish_reason = settle_finish_reason(map_stop_reason(resp.stop_reason.as_deref()), !tool_calls.is_empty());

    ChatResponse {
        content,
        tool_calls,
        finish_reason,
        usage: resp.usage.map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
        model: resp.model,
        provider: provider.to_owned(),
    }
}

fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

// -- Stream --

/// Tool use block whose input JSON is still arriving
#[derive(Debug)]
struct PendingToolUse {
    id: String,
    name: String,
    input_json: String,
}

/// Stream state for Anthropic SSE events
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    current_tool: Option<PendingToolUse>,
    stop_reason: Option<String>,
    saw_tool_call: bool,
}

impl AnthropicStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_tool(&mut self) -> Option<StreamChunk> {
        let pending = self.current_tool.take()?;
        self.saw_tool_call = true;
        let arguments = ToolCall::parse_arguments(&pending.input_json);
        Some(StreamChunk::tool_calls(vec![ToolCall::new(
            pending.id,
            pending.name,
            arguments,
        )]))
    }

    fn finish_reason(&self) -> FinishReason {
        settle_finish_reason(map_stop_reason(self.stop_reason.as_deref()), self.saw_tool_call)
    }
}

impl StreamState for AnthropicStreamState {
    type Event = AnthropicStreamEvent;

    fn convert_event(&mut self, event: AnthropicStreamEvent) -> Vec<StreamChunk> {
        match event {
            AnthropicStreamEvent::MessageStart { .. } | AnthropicStreamEvent::Ping => Vec::new(),

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::Text { text } if !text.is_empty() => vec![StreamChunk::text(text)],
                AnthropicStreamContentBlock::ToolUse { id, name } => {
                    self.current_tool = Some(PendingToolUse {
                        id,
                        name,
                        input_json: String::new(),
                    });
                    Vec::new()
                }
                AnthropicStreamContentBlock::Text { .. } | AnthropicStreamContentBlock::Other => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } if !text.is_empty() => vec![StreamChunk::text(text)],
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = &mut self.current_tool {
                        tool.input_json.push_str(&partial_json);
                    }
                    Vec::new()
                }
                AnthropicStreamDelta::TextDelta { .. } | AnthropicStreamDelta::Other => Vec::new(),
            },

            AnthropicStreamEvent::ContentBlockStop { .. } => self.close_tool().into_iter().collect(),

            AnthropicStreamEvent::MessageDelta { delta } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                Vec::new()
            }

            AnthropicStreamEvent::MessageStop => vec![StreamChunk::done(self.finish_reason())],

            AnthropicStreamEvent::Error { error } => {
                tracing::warn!(error_type = %error.error_type, message = %error.message, "anthropic stream reported error");
                vec![StreamChunk::done(FinishReason::Error)]
            }
        }
    }

    fn finish(&mut self) -> Vec<StreamChunk> {
        let mut chunks: Vec<StreamChunk> = self.close_tool().into_iter().collect();
        chunks.push(StreamChunk::done(self.finish_reason()));
        chunks
    }
}
