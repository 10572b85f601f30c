use serde::Deserialize;

/// In-memory conversation history limits
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Messages retained per session before the oldest are dropped
    #[serde(default = "default_max_messages")]
    pub max_messages_per_session: usize,
    /// Most recent messages handed to the model as context
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages_per_session: default_max_messages(),
            context_window: default_context_window(),
        }
    }
}

const fn default_max_messages() -> usize {
    50
}

const fn default_context_window() -> usize {
    20
}
