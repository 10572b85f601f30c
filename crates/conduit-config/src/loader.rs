use std::collections::HashSet;
use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_llm_config()?;
        self.validate_engine_config()?;
        self.validate_history_config()?;

        if self.tools.timeout_seconds == 0 {
            anyhow::bail!("tools.timeout_seconds must be greater than 0");
        }

        Ok(())
    }

    fn validate_llm_config(&self) -> anyhow::Result<()> {
        if self.llm.fallback_order.is_empty() {
            anyhow::bail!("llm.fallback_order must list at least one provider");
        }

        let mut seen = HashSet::new();
        for kind in &self.llm.fallback_order {
            if !seen.insert(kind) {
                anyhow::bail!("llm.fallback_order lists '{kind}' more than once");
            }
        }

        for kind in crate::ProviderKind::ALL {
            let provider = self.llm.providers.get(kind);

            if provider.timeout_seconds == Some(0) {
                anyhow::bail!("llm.providers.{kind}.timeout_seconds must be greater than 0");
            }
            if provider.max_tokens == Some(0) {
                anyhow::bail!("llm.providers.{kind}.max_tokens must be greater than 0");
            }
            if provider.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                anyhow::bail!("llm.providers.{kind}.model must not be empty");
            }
        }

        Ok(())
    }

    fn validate_engine_config(&self) -> anyhow::Result<()> {
        if self.engine.max_tool_iterations == 0 {
            anyhow::bail!("engine.max_tool_iterations must be greater than 0");
        }

        Ok(())
    }

    fn validate_history_config(&self) -> anyhow::Result<()> {
        if self.history.context_window > self.history.max_messages_per_session {
            anyhow::bail!(
                "history.context_window ({}) cannot exceed history.max_messages_per_session ({})",
                self.history.context_window,
                self.history.max_messages_per_session
            );
        }

        Ok(())
    }
}
