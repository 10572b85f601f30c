use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ProviderKind {
    /// Anthropic Messages API
    #[serde(rename = "anthropic")]
    Anthropic,
    /// `OpenAI` chat completions API
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini `generateContent` API
    #[serde(rename = "gemini")]
    Gemini,
    /// Local Ollama server
    #[serde(rename = "ollama")]
    Ollama,
}

impl ProviderKind {
    /// Every supported vendor, in default fallback order
    pub const ALL: [Self; 4] = [Self::Anthropic, Self::OpenAi, Self::Gemini, Self::Ollama];

    /// Canonical lowercase name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    /// Whether the vendor runs locally and needs no credential
    pub const fn is_local(self) -> bool {
        matches!(self, Self::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider name did not match any supported vendor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownProvider(s.to_owned()))
    }
}

/// Top-level LLM configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: ProviderKind,
    /// Model override applied to the default provider
    #[serde(default)]
    pub default_model: Option<String>,
    /// Order in which providers are probed during health fallback
    #[serde(default = "default_fallback_order")]
    pub fallback_order: Vec<ProviderKind>,
    /// Per-vendor settings
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: None,
            fallback_order: default_fallback_order(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Whether a provider can be used at all
    ///
    /// Remote vendors need a non-empty API key, the local vendor is always available.
    pub fn is_available(&self, kind: ProviderKind) -> bool {
        kind.is_local() || self.providers.get(kind).has_credentials()
    }

    /// All usable providers in canonical order
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }
}

const fn default_provider() -> ProviderKind {
    ProviderKind::Anthropic
}

fn default_fallback_order() -> Vec<ProviderKind> {
    ProviderKind::ALL.to_vec()
}

/// Settings for each supported vendor
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
    #[serde(default)]
    pub ollama: ProviderConfig,
}

impl ProvidersConfig {
    /// Settings for one vendor
    pub const fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Ollama => &self.ollama,
        }
    }

    /// Mutable settings for one vendor
    pub const fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Ollama => &mut self.ollama,
        }
    }
}

/// Configuration for a single vendor
///
/// Every field is optional; unset fields fall back to the vendor default
/// when the provider is constructed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Model identifier
    #[serde(default)]
    pub model: Option<String>,
    /// Maximum tokens to generate per response
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl ProviderConfig {
    /// Whether a non-blank API key is configured
    pub fn has_credentials(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}
