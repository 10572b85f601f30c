//! Configuration pointing providers and tools at the mock servers

use conduit_config::{LlmConfig, ProviderKind, ToolsConfig};
use url::Url;

/// Builder for an `LlmConfig` whose vendors live on mock servers
pub struct LlmConfigBuilder {
    config: LlmConfig,
}

impl LlmConfigBuilder {
    pub fn new(default_provider: ProviderKind) -> Self {
        let mut config = LlmConfig::default();
        config.default_provider = default_provider;
        Self { config }
    }

    /// Route `kind` to `base_url` with a test key
    pub fn vendor(mut self, kind: ProviderKind, base_url: &str) -> Self {
        let provider = self.config.providers.get_mut(kind);
        provider.base_url = Some(Url::parse(base_url).unwrap());
        provider.timeout_seconds = Some(5);
        if !kind.is_local() {
            provider.api_key = Some("test-key".into());
        }
        self
    }

    pub fn model(mut self, kind: ProviderKind, model: &str) -> Self {
        self.config.providers.get_mut(kind).model = Some(model.to_owned());
        self
    }

    pub fn fallback_order(mut self, order: &[ProviderKind]) -> Self {
        self.config.fallback_order = order.to_vec();
        self
    }

    pub fn build(self) -> LlmConfig {
        self.config
    }
}

pub fn tools_config(url: &str) -> ToolsConfig {
    ToolsConfig {
        enabled: true,
        url: Url::parse(url).unwrap(),
        timeout_seconds: 5,
    }
}
