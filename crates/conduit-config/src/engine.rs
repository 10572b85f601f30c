use serde::Deserialize;

/// Orchestration engine settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on provider round-trips within one tool loop
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
    /// System prompt used when a request does not carry one
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            system_prompt: None,
        }
    }
}

const fn default_max_tool_iterations() -> usize {
    10
}
