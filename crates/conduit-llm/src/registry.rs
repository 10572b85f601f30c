//! Provider construction, caching, and health-based selection

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use conduit_config::{LlmConfig, ProviderKind};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use url::Url;

use crate::error::LlmError;
use crate::provider::anthropic::{self, AnthropicProvider};
use crate::provider::gemini::{self, GeminiProvider};
use crate::provider::ollama::{self, OllamaProvider};
use crate::provider::openai::{self, OpenAiProvider};
use crate::provider::{Provider, ProviderSettings};

/// Request timeout for remote vendors when none is configured
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// Explicit settings that win over configuration and vendor defaults
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<Url>,
    pub timeout: Option<Duration>,
}

impl ProviderOverrides {
    /// Override only the model
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }
}

/// Builds provider instances from resolved settings
///
/// The registry goes through this seam so tests can substitute providers
/// without any network.
pub trait ProviderFactory: Send + Sync {
    /// Construct a provider for `kind`
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if the settings are unusable.
    fn build(&self, kind: ProviderKind, settings: ProviderSettings) -> Result<Arc<dyn Provider>, LlmError>;
}

/// Factory producing the HTTP-backed vendor providers
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn build(&self, kind: ProviderKind, settings: ProviderSettings) -> Result<Arc<dyn Provider>, LlmError> {
        Ok(match kind {
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(settings)?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(settings)?),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(settings)?),
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(settings)?),
        })
    }
}

/// Registry of provider instances
///
/// An explicit component owned by the caller, not process-global state.
/// Cached instances live as long as the registry; lookups take a read lock
/// and only a cache miss takes the write lock.
pub struct ProviderRegistry {
    config: LlmConfig,
    factory: Arc<dyn ProviderFactory>,
    cache: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Registry backed by the HTTP vendor providers
    pub fn new(config: LlmConfig) -> Self {
        Self::with_factory(config, Arc::new(HttpProviderFactory))
    }

    /// Registry with a custom provider factory
    pub fn with_factory(config: LlmConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            config,
            factory,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Whether a provider has a usable credential (always true for Ollama)
    pub fn is_available(&self, kind: ProviderKind) -> bool {
        self.config.is_available(kind)
    }

    pub fn available_providers(&self) -> Vec<ProviderKind> {
        self.config.available_providers()
    }

    /// Merge overrides, configuration and vendor defaults
    ///
    /// Model precedence: override, the vendor's configured model,
    /// `llm.default_model` (default provider only), vendor default.
    pub fn resolve_settings(&self, kind: ProviderKind, overrides: ProviderOverrides) -> ProviderSettings {
        let configured = self.config.providers.get(kind);
        let defaults = VendorDefaults::of(kind);

        let model = overrides
            .model
            .or_else(|| configured.model.clone())
            .or_else(|| {
                (kind == self.config.default_provider)
                    .then(|| self.config.default_model.clone())
                    .flatten()
            })
            .unwrap_or_else(|| defaults.model.to_owned());

        let api_key = overrides
            .api_key
            .or_else(|| configured.api_key.clone())
            .filter(|key| !key.expose_secret().trim().is_empty());

        ProviderSettings {
            api_key,
            model,
            max_tokens: overrides
                .max_tokens
                .or(configured.max_tokens)
                .unwrap_or(defaults.max_tokens),
            base_url: overrides
                .base_url
                .or_else(|| configured.base_url.clone())
                .unwrap_or_else(defaults.base_url),
            timeout: overrides
                .timeout
                .or_else(|| configured.timeout_seconds.map(Duration::from_secs))
                .unwrap_or(defaults.timeout),
        }
    }

    /// Construct a fresh, uncached provider
    ///
    /// Configuration is never mutated; overrides apply to this instance only.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if the provider cannot be built.
    pub fn create_provider(
        &self,
        kind: ProviderKind,
        overrides: ProviderOverrides,
    ) -> Result<Arc<dyn Provider>, LlmError> {
        let settings = self.resolve_settings(kind, overrides);
        tracing::debug!(provider = %kind, model = %settings.model, "creating provider");
        self.factory.build(kind, settings)
    }

    /// Return the cached provider for `cache_key` (or `kind`), creating it once
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if the provider cannot be built.
    pub async fn get_or_create(
        &self,
        kind: ProviderKind,
        cache_key: Option<&str>,
    ) -> Result<Arc<dyn Provider>, LlmError> {
        let key = cache_key.unwrap_or(kind.as_str());

        if let Some(provider) = self.cache.read().await.get(key) {
            return Ok(Arc::clone(provider));
        }

        let mut cache = self.cache.write().await;
        // Another task may have filled the slot while we waited for the lock
        if let Some(provider) = cache.get(key) {
            return Ok(Arc::clone(provider));
        }

        let provider = self.create_provider(kind, ProviderOverrides::default())?;
        cache.insert(key.to_owned(), Arc::clone(&provider));

        Ok(provider)
    }

    /// Drop every cached instance
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Probe candidates in order and return the first healthy one
    ///
    /// Candidates are `preferred` (if available) followed by `fallback_order`
    /// (or the configured order) filtered to available providers not yet
    /// tried. Probes run one at a time and stop at the first success.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::NoHealthyProvider` listing every provider tried.
    pub async fn get_healthy_provider(
        &self,
        preferred: Option<ProviderKind>,
        fallback_order: Option<&[ProviderKind]>,
    ) -> Result<Arc<dyn Provider>, LlmError> {
        let fallback_order = fallback_order.unwrap_or(&self.config.fallback_order);

        let mut candidates: Vec<ProviderKind> = Vec::with_capacity(fallback_order.len() + 1);
        for kind in preferred.into_iter().chain(fallback_order.iter().copied()) {
            if self.is_available(kind) && !candidates.contains(&kind) {
                candidates.push(kind);
            }
        }

        let mut tried = Vec::with_capacity(candidates.len());
        for kind in candidates {
            tried.push(kind.to_string());

            let provider = match self.get_or_create(kind, None).await {
                Ok(provider) => provider,
                Err(e) => {
                    tracing::warn!(provider = %kind, error = %e, "skipping provider that could not be created");
                    continue;
                }
            };

            if provider.health_check().await {
                tracing::info!(provider = %kind, model = %provider.model(), "selected healthy provider");
                return Ok(provider);
            }

            tracing::warn!(provider = %kind, "provider failed health check, trying next");
        }

        Err(LlmError::NoHealthyProvider { tried })
    }
}

struct VendorDefaults {
    model: &'static str,
    max_tokens: u32,
    timeout: Duration,
    base_url: fn() -> Url,
}

impl VendorDefaults {
    const fn of(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Anthropic => Self {
                model: anthropic::DEFAULT_MODEL,
                max_tokens: anthropic::DEFAULT_MAX_TOKENS,
                timeout: DEFAULT_REMOTE_TIMEOUT,
                base_url: AnthropicProvider::default_base_url,
            },
            ProviderKind::OpenAi => Self {
                model: openai::DEFAULT_MODEL,
                max_tokens: openai::DEFAULT_MAX_TOKENS,
                timeout: DEFAULT_REMOTE_TIMEOUT,
                base_url: OpenAiProvider::default_base_url,
            },
            ProviderKind::Gemini => Self {
                model: gemini::DEFAULT_MODEL,
                max_tokens: gemini::DEFAULT_MAX_TOKENS,
                timeout: DEFAULT_REMOTE_TIMEOUT,
                base_url: GeminiProvider::default_base_url,
            },
            ProviderKind::Ollama => Self {
                model: ollama::DEFAULT_MODEL,
                max_tokens: ollama::DEFAULT_MAX_TOKENS,
                timeout: ollama::DEFAULT_TIMEOUT,
                base_url: OllamaProvider::default_base_url,
            },
        }
    }
}
