use serde::Deserialize;
use url::Url;

/// External tool-execution endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Whether tool execution is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL of the tool server
    #[serde(default = "default_url")]
    pub url: Url,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

fn default_url() -> Url {
    Url::parse("http://localhost:8080").expect("valid default URL")
}

const fn default_timeout_seconds() -> u64 {
    30
}
