//! Ollama native chat API provider implementation

use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ProviderKind;
use reqwest::Client;
use url::Url;

use super::{Provider, ProviderCapabilities, ProviderSettings};
use crate::convert::ollama::{OllamaStreamState, build_request, into_chat_response};
use crate::error::LlmError;
use crate::protocol::ollama::{OllamaRequest, OllamaResponse, OllamaTagList};
use crate::types::{ChatMessage, ChatResponse, ChunkStream, ToolDefinition};

/// Default local Ollama server
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

pub const DEFAULT_MODEL: &str = "llama3.1:8b";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Local models can be slow to load, so the default timeout is longer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Ollama provider
///
/// Needs no credential; health means the server answers and has the
/// configured model pulled.
pub struct OllamaProvider {
    client: Client,
    base_url: Url,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaProvider {
    /// Create from resolved settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if the HTTP client cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        Ok(Self {
            client: super::http_client(ProviderKind::Ollama, settings.timeout)?,
            base_url: settings.base_url,
            model: settings.model,
            max_tokens: settings.max_tokens,
            timeout: settings.timeout,
        })
    }

    /// Default base URL
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded default base URL is invalid (should never happen).
    pub fn default_base_url() -> Url {
        Url::parse(DEFAULT_BASE_URL).expect("valid default URL")
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/api/{path}")
    }

    fn request(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        stream: bool,
    ) -> OllamaRequest {
        build_request(messages, system_prompt, tools, &self.model, self.max_tokens, stream)
    }

    /// Whether the server lists the configured model
    async fn has_model(&self) -> Result<bool, LlmError> {
        let builder = self.client.get(self.api_url("tags")).timeout(self.timeout);
        let response = super::send(self.name(), builder).await?;
        let tags: OllamaTagList = super::decode(self.name(), response).await?;

        Ok(tags.models.iter().any(|m| m.name.contains(&self.model)))
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatResponse, LlmError> {
        let request = self.request(messages, system_prompt, tools, false);
        let builder = self.client.post(self.api_url("chat")).json(&request).timeout(self.timeout);

        let response = super::send(self.name(), builder).await?;
        let wire_response: OllamaResponse = super::decode(self.name(), response).await?;

        Ok(into_chat_response(wire_response, self.name()))
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChunkStream, LlmError> {
        let request = self.request(messages, system_prompt, tools, true);
        let builder = self.client.post(self.api_url("chat")).json(&request);

        let response = super::send(self.name(), builder).await?;
        let payloads = super::ndjson_payloads(self.name(), response);

        Ok(super::chunk_stream(self.name(), payloads, OllamaStreamState::new()))
    }

    async fn health_check(&self) -> bool {
        match self.has_model().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(provider = %self.name(), model = %self.model, "model is not pulled on ollama server");
                false
            }
            Err(e) => super::probe_outcome::<()>(self.name(), Err(e)),
        }
    }
}
