//! Google Gemini `generateContent` provider implementation

use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ProviderKind;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{Provider, ProviderCapabilities, ProviderSettings};
use crate::convert::gemini::{GeminiStreamState, build_request, into_chat_response};
use crate::error::LlmError;
use crate::protocol::gemini::{GeminiRequest, GeminiResponse};
use crate::types::{ChatMessage, ChatResponse, ChunkStream, ToolDefinition};

/// Default Generative Language API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Gemini answers a rejected key with 400 rather than 401
const INVALID_KEY_MARKER: &str = "API key not valid";

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl GeminiProvider {
    /// Create from resolved settings
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Configuration` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        let api_key = settings.require_api_key(ProviderKind::Gemini)?;

        Ok(Self {
            client: super::http_client(ProviderKind::Gemini, settings.timeout)?,
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

    /// Build a model-scoped endpoint URL, e.g. `generateContent`
    fn model_url(&self, method: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/models/{}:{method}", self.model)
    }

    fn post(&self, method: &str, request: &GeminiRequest) -> RequestBuilder {
        self.client
            .post(self.model_url(method))
            .query(&[("key", self.api_key.expose_secret())])
            .json(request)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, LlmError> {
        super::send(self.name(), builder).await.map_err(reclassify_invalid_key)
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<ChatResponse, LlmError> {
        let builder = self.post("generateContent", request).timeout(self.timeout);
        let response = self.send(builder).await?;
        let wire_response: GeminiResponse = super::decode(self.name(), response).await?;

        Ok(into_chat_response(wire_response, self.name(), &self.model))
    }
}

fn reclassify_invalid_key(error: LlmError) -> LlmError {
    match error {
        LlmError::Provider {
            provider,
            status: Some(400),
            message,
        } if message.contains(INVALID_KEY_MARKER) => LlmError::Authentication { provider },
        other => other,
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
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
        let request = build_request(messages, system_prompt, tools, self.max_tokens);
        self.generate(&request).await
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChunkStream, LlmError> {
        let request = build_request(messages, system_prompt, tools, self.max_tokens);
        let builder = self.post("streamGenerateContent", &request).query(&[("alt", "sse")]);

        let response = self.send(builder).await?;
        let payloads = super::sse_payloads(self.name(), response);

        Ok(super::chunk_stream(self.name(), payloads, GeminiStreamState::new()))
    }

    async fn health_check(&self) -> bool {
        let request = build_request(&[ChatMessage::user("Hi")], None, None, self.max_tokens);
        super::probe_outcome(self.name(), self.generate(&request).await)
    }
}
