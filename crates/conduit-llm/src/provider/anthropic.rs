//! Anthropic Messages API provider implementation

use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ProviderKind;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Provider, ProviderCapabilities, ProviderSettings};
use crate::convert::anthropic::{AnthropicStreamState, build_request, into_chat_response};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::types::{ChatMessage, ChatResponse, ChunkStream, ToolDefinition};

/// Default Anthropic API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default output token limit
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Output tokens requested by the health probe
const PROBE_MAX_TOKENS: u32 = 10;

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl AnthropicProvider {
    /// Create from resolved settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        let api_key = settings.require_api_key(ProviderKind::Anthropic)?;

        Ok(Self {
            client: super::http_client(ProviderKind::Anthropic, settings.timeout)?,
            base_url: settings.base_url,
            api_key,
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

    /// Build the messages endpoint URL
    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }

    fn post(&self, request: &AnthropicRequest) -> RequestBuilder {
        self.client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
    }

    async fn send_messages(&self, request: &AnthropicRequest) -> Result<ChatResponse, LlmError> {
        let response = super::send(self.name(), self.post(request).timeout(self.timeout)).await?;
        let wire_response: AnthropicResponse = super::decode(self.name(), response).await?;

        Ok(into_chat_response(wire_response, self.name()))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
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
        let request = build_request(messages, system_prompt, tools, &self.model, self.max_tokens);
        self.send_messages(&request).await
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChunkStream, LlmError> {
        let mut request = build_request(messages, system_prompt, tools, &self.model, self.max_tokens);
        request.stream = Some(true);

        let response = super::send(self.name(), self.post(&request)).await?;
        let payloads = super::sse_payloads(self.name(), response);

        Ok(super::chunk_stream(self.name(), payloads, AnthropicStreamState::new()))
    }

    async fn health_check(&self) -> bool {
        let request = build_request(
            &[ChatMessage::user("Hi")],
            None,
            None,
            &self.model,
            PROBE_MAX_TOKENS,
        );
        super::probe_outcome(self.name(), self.send_messages(&request).await)
    }
}
