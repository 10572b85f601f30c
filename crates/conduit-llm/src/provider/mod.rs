//! Provider trait and implementations for LLM backends

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ProviderKind;
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use url::Url;

use crate::convert::StreamState;
use crate::error::LlmError;
use crate::types::{ChatMessage, ChatResponse, ChunkStream, StreamChunk, ToolDefinition};

/// Capabilities advertised by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Whether the provider supports streaming responses
    pub streaming: bool,
    /// Whether the provider supports tool/function calling
    pub tool_calling: bool,
}

/// Trait implemented by each LLM provider backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Vendor this provider talks to
    fn kind(&self) -> ProviderKind;

    /// Provider name used in logs, errors and responses
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Model requests are sent to
    fn model(&self) -> &str;

    /// Advertised capabilities
    fn capabilities(&self) -> ProviderCapabilities;

    /// Send one chat round-trip
    ///
    /// Never loops on tool calls; the caller decides what to do with them.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChatResponse, LlmError>;

    /// Send one streaming round-trip
    ///
    /// The request is sent and its status checked before the stream is
    /// returned, so authentication and rate-limit failures surface here.
    /// The stream ends with exactly one `done` chunk unless the transport
    /// breaks, in which case its last item is an error.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChunkStream, LlmError>;

    /// Cheap liveness probe; every failure collapses to `false`
    async fn health_check(&self) -> bool;
}

/// Fully resolved settings a provider is constructed from
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Credential, required by remote vendors
    pub api_key: Option<SecretString>,
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate per response
    pub max_tokens: u32,
    /// API base URL
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Credential for a remote vendor
    pub(crate) fn require_api_key(&self, kind: ProviderKind) -> Result<SecretString, LlmError> {
        self.api_key
            .clone()
            .ok_or_else(|| LlmError::Configuration(format!("{kind}: API key is not configured")))
    }
}

/// Shared HTTP client for one provider instance
///
/// Only the connect phase is bounded here; non-streaming calls set the full
/// request timeout per request so long streams are not cut off.
pub(crate) fn http_client(kind: ProviderKind, timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .connect_timeout(timeout)
        .build()
        .map_err(|e| LlmError::Configuration(format!("{kind}: failed to build HTTP client: {e}")))
}

/// Send a request and classify any non-success status
pub(crate) async fn send(provider: &str, builder: RequestBuilder) -> Result<Response, LlmError> {
    let response = builder.send().await.map_err(|e| LlmError::transport(provider, &e))?;

    if !response.status().is_success() {
        return Err(LlmError::from_response(provider, response).await);
    }

    Ok(response)
}

/// Decode a JSON response body
pub(crate) async fn decode<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T, LlmError> {
    response.json().await.map_err(|e| LlmError::decode(provider, e))
}

/// Collapse a probe result to a boolean, logging the failure
pub(crate) fn probe_outcome<T>(provider: &str, result: Result<T, LlmError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(provider, error = %e, "health check failed");
            false
        }
    }
}

/// Raw event payloads: SSE `data` fields or NDJSON lines
pub(crate) type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Payloads of a server-sent event stream
pub(crate) fn sse_payloads(provider: &str, response: Response) -> PayloadStream {
    let provider = provider.to_owned();
    Box::pin(
        response
            .bytes_stream()
            .eventsource()
            .map(move |event| event.map(|e| e.data).map_err(|e| LlmError::interrupted(&provider, e))),
    )
}

/// Lines of a newline-delimited JSON stream
pub(crate) fn ndjson_payloads(provider: &str, response: Response) -> PayloadStream {
    let provider = provider.to_owned();
    let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
    Box::pin(
        FramedRead::new(reader, LinesCodec::new()).map(move |line| line.map_err(|e| LlmError::interrupted(&provider, e))),
    )
}

/// SSE sentinel some vendors send after the last event
const DONE_SENTINEL: &str = "[DONE]";

struct Driver<S> {
    provider: String,
    payloads: PayloadStream,
    state: S,
    pending: VecDeque<StreamChunk>,
    finished: bool,
}

/// Turn raw payloads into chunks through a vendor stream state
///
/// The stream stops after the first `done` chunk. When the transport ends
/// early the state is flushed so a `done` chunk is still produced; a
/// transport error is yielded once and ends the stream. Payloads that fail
/// to decode are skipped.
pub(crate) fn chunk_stream<S: StreamState>(provider: &str, payloads: PayloadStream, state: S) -> ChunkStream {
    let driver = Driver {
        provider: provider.to_owned(),
        payloads,
        state,
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures_util::stream::unfold(driver, |mut driver| async move {
        loop {
            if let Some(chunk) = driver.pending.pop_front() {
                if chunk.done {
                    driver.finished = true;
                    driver.pending.clear();
                }
                return Some((Ok(chunk), driver));
            }

            if driver.finished {
                return None;
            }

            match driver.payloads.next().await {
                Some(Ok(payload)) => {
                    let payload = payload.trim();
                    if payload.is_empty() {
                        continue;
                    }

                    if payload == DONE_SENTINEL {
                        let chunks = driver.state.finish();
                        driver.pending.extend(chunks);
                        driver.finished = true;
                        continue;
                    }

                    match serde_json::from_str::<S::Event>(payload) {
                        Ok(event) => {
                            let chunks = driver.state.convert_event(event);
                            driver.pending.extend(chunks);
                        }
                        Err(e) => {
                            tracing::debug!(provider = %driver.provider, error = %e, "skipping unparseable stream event");
                        }
                    }
                }
                Some(Err(e)) => {
                    driver.finished = true;
                    return Some((Err(e), driver));
                }
                None => {
                    let chunks = driver.state.finish();
                    driver.pending.extend(chunks);
                    driver.finished = true;
                }
            }
        }
    }))
}
