//! `OpenAI` chat completions provider implementation

use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ProviderKind;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Provider, ProviderCapabilities, ProviderSettings};
use crate::convert::openai::{OpenAiStreamState, build_request, into_chat_response};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse};
use crate::types::{ChatMessage, ChatResponse, ChunkStream, ToolDefinition};

/// Default `OpenAI` API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4o";

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const PROBE_MAX_TOKENS: u32 = 10;

/// `OpenAI` chat completions provider
pub struct OpenAiProvider {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Create from resolved settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        let api_key = settings.require_api_key(ProviderKind::OpenAi)?;

        Ok(Self {
            client: super::http_client(ProviderKind::OpenAi, settings.timeout)?,
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

    /// Build the chat completions endpoint URL
    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn post(&self, request: &OpenAiRequest) -> RequestBuilder {
        self.client
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
    }

    async fn send_completion(&self, request: &OpenAiRequest) -> Result<ChatResponse, LlmError> {
        let response = super::send(self.name(), self.post(request).timeout(self.timeout)).await?;
        let wire_response: OpenAiResponse = super::decode(self.name(), response).await?;

        into_chat_response(wire_response, self.name())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
        self.send_completion(&request).await
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

        Ok(super::chunk_stream(self.name(), payloads, OpenAiStreamState::new()))
    }

    async fn health_check(&self) -> bool {
        let request = build_request(
            &[ChatMessage::user("Hi")],
            None,
            None,
            &self.model,
            PROBE_MAX_TOKENS,
        );
        super::probe_outcome(self.name(), self.send_completion(&request).await)
    }
}
