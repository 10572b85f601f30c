use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured tool-call arguments
pub type ToolArguments = Map<String, Value>;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

impl Role {
    /// Lowercase role name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Message in a conversation
///
/// A `tool` message always carries the id of the call it answers. An
/// `assistant` message that requests tools may have empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: Role,
    /// Text content
    #[serde(default)]
    pub content: String,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name for tool results, or participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Tool result answering a previous call
    ///
    /// The tool name travels along so vendors that key function responses
    /// by name can correlate them.
    pub fn tool_result(result: &ToolResult, tool_name: Option<&str>) -> Self {
        Self {
            tool_call_id: Some(result.tool_call_id.clone()),
            name: tool_name.map(ToOwned::to_owned),
            ..Self::with_role(Role::Tool, result.content.clone())
        }
    }

    /// Tool calls carried by this message, empty when there are none
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier, unique within one response
    pub id: String,
    /// Tool name
    pub name: String,
    /// Structured arguments
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse vendor-supplied argument JSON
    ///
    /// Malformed or non-object JSON degrades to empty arguments rather than
    /// failing the response it arrived in.
    pub fn parse_arguments(raw: &str) -> ToolArguments {
        if raw.trim().is_empty() {
            return ToolArguments::new();
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::debug!(kind = %json_kind(&other), "tool arguments were not a JSON object");
                ToolArguments::new()
            }
            Err(e) => {
                tracing::debug!(error = %e, "discarding malformed tool arguments");
                ToolArguments::new()
            }
        }
    }

    /// Arguments as an owned JSON object value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of executing one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the call this result answers
    pub tool_call_id: String,
    /// Flattened text output
    pub content: String,
    /// Whether execution failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(tool_call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: message.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn well_formed_arguments_are_parsed() {
        let args = ToolCall::parse_arguments(r#"{"city":"Paris","days":3}"#);
        assert_eq!(Value::Object(args), json!({"city": "Paris", "days": 3}));
    }

    #[test]
    fn truncated_arguments_degrade_to_empty() {
        assert!(ToolCall::parse_arguments(r#"{"city":"Par"#).is_empty());
    }

    #[test]
    fn non_object_arguments_degrade_to_empty() {
        assert!(ToolCall::parse_arguments("[1, 2]").is_empty());
        assert!(ToolCall::parse_arguments("").is_empty());
    }

    #[test]
    fn tool_result_message_keeps_correlation() {
        let result = ToolResult::success("call_1", "42");
        let message = ChatMessage::tool_result(&result, Some("calculator"));

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(message.name.as_deref(), Some("calculator"));
        assert_eq!(message.content, "42");
    }

    #[test]
    fn message_serializes_without_empty_optionals() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }
}
