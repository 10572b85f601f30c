//! Wire types of the tool-execution endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /tools` body, either wrapped as `{"tools": [..]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ToolListing {
    Wrapped {
        #[serde(default)]
        tools: Vec<RemoteTool>,
    },
    Bare(Vec<RemoteTool>),
}

impl ToolListing {
    pub(crate) fn into_tools(self) -> Vec<RemoteTool> {
        match self {
            Self::Wrapped { tools } | Self::Bare(tools) => tools,
        }
    }
}

/// One tool as advertised by the endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// `POST /tools/{name}` body
#[derive(Debug, Serialize)]
pub(crate) struct InvokeRequest<'a> {
    pub arguments: &'a Map<String, Value>,
}

/// `POST /tools/{name}` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvokeResponse {
    #[serde(default)]
    pub content: ToolContent,
    #[serde(default)]
    pub is_error: bool,
}

/// Result content in any of the shapes the endpoint produces
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ToolContent {
    Text(String),
    Items(Vec<ContentItem>),
    Object(Map<String, Value>),
    Other(Value),
}

impl Default for ToolContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentItem {
    Text(String),
    Block { text: String },
    Other(Value),
}

impl ToolContent {
    /// Flatten into the single string a tool result carries
    ///
    /// Text items are joined with newlines and non-text blocks are skipped.
    /// Objects are kept as compact JSON.
    pub(crate) fn flatten(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Items(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    ContentItem::Text(text) | ContentItem::Block { text } => Some(text),
                    ContentItem::Other(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Object(map) => Value::Object(map).to_string(),
            Self::Other(Value::Null) => String::new(),
            Self::Other(value) => value.to_string(),
        }
    }
}
