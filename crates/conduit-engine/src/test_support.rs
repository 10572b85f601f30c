//! Scripted providers and executors for engine tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use conduit_config::{EngineConfig, LlmConfig};
use conduit_llm::{
    ChatMessage, ChatResponse, ChunkStream, FinishReason, LlmError, Provider, ProviderCapabilities, ProviderFactory,
    ProviderKind, ProviderRegistry, ProviderSettings, StreamChunk, ToolArguments, ToolCall, ToolDefinition, ToolResult,
};
use conduit_tools::ToolExecutor;
use futures_util::StreamExt;
use serde_json::json;

use crate::engine::Engine;

/// What a provider was asked in one round
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub tool_names: Option<Vec<String>>,
}

impl RecordedRequest {
    fn new(messages: &[ChatMessage], system_prompt: Option<&str>, tools: Option<&[ToolDefinition]>) -> Self {
        Self {
            messages: messages.to_vec(),
            system_prompt: system_prompt.map(ToOwned::to_owned),
            tool_names: tools.map(|tools| tools.iter().map(|tool| tool.name.clone()).collect()),
        }
    }
}

/// Provider replaying scripted responses; the last entry repeats forever
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ChatResponse>>,
    rounds: Mutex<VecDeque<Vec<StreamChunk>>>,
    chats: Mutex<Vec<RecordedRequest>>,
    streams: Mutex<Vec<RecordedRequest>>,
    fail_stream: AtomicBool,
    hold_open: AtomicBool,
    open_streams: Arc<AtomicU32>,
    pub probes: AtomicU32,
}

/// Held by every handed-out stream; counts the stream as open until dropped
struct OpenStream(Arc<AtomicU32>);

impl Drop for OpenStream {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedProvider {
    pub fn replying(replies: Vec<ChatResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            rounds: Mutex::default(),
            chats: Mutex::default(),
            streams: Mutex::default(),
            fail_stream: AtomicBool::new(false),
            hold_open: AtomicBool::new(false),
            open_streams: Arc::default(),
            probes: AtomicU32::new(0),
        }
    }

    pub fn with_rounds(self, rounds: Vec<Vec<StreamChunk>>) -> Self {
        *self.rounds.lock().unwrap() = rounds.into();
        self
    }

    /// Streams end with a transport error after their scripted chunks
    pub fn fail_stream_after_script(&self) {
        self.fail_stream.store(true, Ordering::SeqCst);
    }

    /// Streams never end after their scripted chunks, like a stalled connection
    pub fn hold_streams_open(&self) {
        self.hold_open.store(true, Ordering::SeqCst);
    }

    /// Streams handed out and not yet dropped
    pub fn open_streams(&self) -> u32 {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    pub fn stream_calls(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> RecordedRequest {
        self.chats.lock().unwrap()[index].clone()
    }

    pub fn stream_request(&self, index: usize) -> RecordedRequest {
        self.streams.lock().unwrap()[index].clone()
    }

    fn next<T: Clone>(script: &Mutex<VecDeque<T>>) -> T {
        let mut script = script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().expect("script is empty")
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        "scripted"
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
        self.chats
            .lock()
            .unwrap()
            .push(RecordedRequest::new(messages, system_prompt, tools));
        Ok(Self::next(&self.replies))
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        tools: Option<&[ToolDefinition]>,
    ) -> Result<ChunkStream, LlmError> {
        self.streams
            .lock()
            .unwrap()
            .push(RecordedRequest::new(messages, system_prompt, tools));

        let mut items: Vec<Result<StreamChunk, LlmError>> = Self::next(&self.rounds).into_iter().map(Ok).collect();
        if self.fail_stream.load(Ordering::SeqCst) {
            items.push(Err(LlmError::Provider {
                provider: "anthropic".to_owned(),
                status: None,
                message: "connection reset".to_owned(),
            }));
        }

        let tail: ChunkStream = if self.hold_open.load(Ordering::SeqCst) {
            Box::pin(futures_util::stream::pending())
        } else {
            Box::pin(futures_util::stream::empty())
        };

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = OpenStream(Arc::clone(&self.open_streams));

        Ok(Box::pin(futures_util::stream::iter(items).chain(tail).map(move |item| {
            let _open = &guard;
            item
        })))
    }

    async fn health_check(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Hands out one shared provider and records the model of every build
pub struct ScriptedFactory {
    provider: Arc<ScriptedProvider>,
    models: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn built_models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

impl ProviderFactory for ScriptedFactory {
    fn build(&self, _kind: ProviderKind, settings: ProviderSettings) -> Result<Arc<dyn Provider>, LlmError> {
        self.models.lock().unwrap().push(settings.model);
        Ok(self.provider.clone())
    }
}

/// Executor answering every call with `result of <name>`
pub struct FakeExecutor {
    enabled: bool,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeExecutor {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            batches: Mutex::default(),
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for FakeExecutor {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            "lookup",
            "Look something up",
            json!({"type": "object", "properties": {"q": {"type": "string"}}, "required": ["q"]}),
        )]
    }

    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        self.batches
            .lock()
            .unwrap()
            .push(calls.iter().map(|call| call.name.clone()).collect());

        calls
            .iter()
            .map(|call| ToolResult::success(&call.id, format!("result of {}", call.name)))
            .collect()
    }
}

pub fn text_reply(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_owned(),
        tool_calls: Vec::new(),
        finish_reason: FinishReason::Stop,
        usage: None,
        model: "scripted".to_owned(),
        provider: "anthropic".to_owned(),
    }
}

pub fn tool_reply(content: &str, calls: &[(&str, &str)]) -> ChatResponse {
    ChatResponse {
        tool_calls: calls
            .iter()
            .map(|(id, name)| ToolCall::new(*id, *name, ToolArguments::new()))
            .collect(),
        finish_reason: FinishReason::ToolCalls,
        ..text_reply(content)
    }
}

/// Engine over `provider` with an Anthropic key configured
pub fn engine_with(provider: &Arc<ScriptedProvider>, max_tool_iterations: usize) -> (Engine, Arc<ScriptedFactory>) {
    let mut config = LlmConfig::default();
    config.providers.anthropic.api_key = Some("test-key".into());

    let factory = Arc::new(ScriptedFactory {
        provider: Arc::clone(provider),
        models: Mutex::default(),
    });
    let registry = Arc::new(ProviderRegistry::with_factory(config, factory.clone()));

    let engine = Engine::new(
        registry,
        &EngineConfig {
            max_tool_iterations,
            system_prompt: Some("You are helpful.".to_owned()),
        },
    );

    (engine, factory)
}
