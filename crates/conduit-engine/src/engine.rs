//! Request lifecycle: provider resolution and the tool-call loop

use std::sync::Arc;

use conduit_config::EngineConfig;
use conduit_llm::{
    ChatMessage, ChatResponse, ChunkStream, LlmError, Provider, ProviderKind, ProviderOverrides, ProviderRegistry,
    Role, ToolCall, ToolDefinition,
};
use conduit_tools::ToolExecutor;
use indexmap::IndexMap;

use crate::history::ConversationHistory;
use crate::request::ChatRequest;
use crate::stream;

/// Orchestrates providers and tools for chat requests
///
/// Holds no per-request state. The registry's provider cache is the only
/// thing shared between requests.
#[derive(Clone)]
pub struct Engine {
    registry: Arc<ProviderRegistry>,
    tools: Option<Arc<dyn ToolExecutor>>,
    max_tool_iterations: usize,
    system_prompt: Option<String>,
}

impl Engine {
    pub fn new(registry: Arc<ProviderRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            tools: None,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Attach the executor that runs tool calls
    #[must_use]
    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Answer a request, running tool rounds until the model stops asking
    ///
    /// # Errors
    ///
    /// Provider failures propagate unchanged. Returns
    /// `LlmError::MaxToolIterations` once `max_tool_iterations` round-trips
    /// have all ended in tool calls; that last round's calls are not run.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut conversation = self.prepare(&request).await?;
        let mut round = 0;

        loop {
            round += 1;
            tracing::debug!(round, provider = %conversation.provider.name(), "chat round");

            let response = conversation
                .provider
                .chat(
                    &conversation.messages,
                    conversation.system_prompt.as_deref(),
                    conversation.tools.as_deref(),
                )
                .await?;

            if !(response.requests_tools() && conversation.can_execute_tools()) {
                return Ok(response);
            }

            if round >= conversation.max_tool_iterations {
                tracing::warn!(max = conversation.max_tool_iterations, "tool loop did not converge");
                return Err(LlmError::MaxToolIterations {
                    max: conversation.max_tool_iterations,
                });
            }

            conversation.run_tools(response.content, response.tool_calls).await;
        }
    }

    /// Streaming variant of [`chat`](Self::chat)
    ///
    /// Text is forwarded as it arrives. Between tool rounds the stream
    /// carries a [`TOOL_RESULTS_MARKER`](crate::TOOL_RESULTS_MARKER) chunk.
    /// Exceeding the iteration bound ends the stream with an error item.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be resolved. Later failures
    /// arrive as items of the stream.
    pub async fn stream(&self, request: ChatRequest) -> Result<ChunkStream, LlmError> {
        let conversation = self.prepare(&request).await?;
        Ok(stream::tool_loop(conversation))
    }

    /// Run `chat` with context pulled from and written back to `history`
    ///
    /// Context messages come before any history already on the request.
    /// Nothing is recorded when the chat fails.
    pub async fn chat_in_session<H>(
        &self,
        history: &H,
        session_id: &str,
        mut request: ChatRequest,
    ) -> Result<ChatResponse, LlmError>
    where
        H: ConversationHistory + ?Sized,
    {
        let mut context = history.get_messages_for_context(session_id).await;
        context.append(&mut request.history);
        request.history = context;

        let user_message = request.message.clone();
        let response = self.chat(request).await?;

        history.append_message(session_id, Role::User, &user_message).await;
        history
            .append_message(session_id, Role::Assistant, &response.content)
            .await;

        Ok(response)
    }

    /// First healthy provider, starting with `preferred`
    pub async fn get_healthy_provider(&self, preferred: Option<ProviderKind>) -> Result<Arc<dyn Provider>, LlmError> {
        self.registry.get_healthy_provider(preferred, None).await
    }

    /// Probe one provider, or every available one in fallback order
    pub async fn health_check(&self, provider: Option<ProviderKind>) -> IndexMap<String, bool> {
        let config = self.registry.config();

        let kinds = match provider {
            Some(kind) => vec![kind],
            None => {
                let mut kinds = Vec::with_capacity(ProviderKind::ALL.len());
                for kind in config.fallback_order.iter().copied().chain(ProviderKind::ALL) {
                    if config.is_available(kind) && !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                kinds
            }
        };

        let mut statuses = IndexMap::with_capacity(kinds.len());
        for kind in kinds {
            let healthy = match self.registry.get_or_create(kind, None).await {
                Ok(provider) => provider.health_check().await,
                Err(e) => {
                    tracing::warn!(provider = %kind, error = %e, "provider could not be created");
                    false
                }
            };
            statuses.insert(kind.to_string(), healthy);
        }

        statuses
    }

    /// A model override always gets its own uncached instance
    async fn resolve_provider(
        &self,
        kind: Option<ProviderKind>,
        model: Option<&str>,
    ) -> Result<Arc<dyn Provider>, LlmError> {
        let kind = kind.unwrap_or(self.registry.config().default_provider);

        match model {
            Some(model) => self.registry.create_provider(kind, ProviderOverrides::model(model)),
            None => self.registry.get_or_create(kind, None).await,
        }
    }

    async fn prepare(&self, request: &ChatRequest) -> Result<Conversation, LlmError> {
        let provider = self.resolve_provider(request.provider, request.model.as_deref()).await?;

        let executor = self
            .tools
            .as_ref()
            .filter(|tools| request.use_tools && tools.is_enabled() && provider.capabilities().tool_calling)
            .map(Arc::clone);

        let tools = match &executor {
            Some(executor) => Some(executor.tools().await).filter(|tools| !tools.is_empty()),
            None => None,
        };

        Ok(Conversation {
            executor: tools.as_ref().and(executor),
            tools,
            messages: request.messages(),
            system_prompt: request
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            max_tool_iterations: self.max_tool_iterations,
            provider,
        })
    }
}

/// State carried across the rounds of one request
pub(crate) struct Conversation {
    pub(crate) provider: Arc<dyn Provider>,
    /// Present only when tools were offered to the model
    executor: Option<Arc<dyn ToolExecutor>>,
    pub(crate) tools: Option<Vec<ToolDefinition>>,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) system_prompt: Option<String>,
    pub(crate) max_tool_iterations: usize,
}

impl Conversation {
    pub(crate) const fn can_execute_tools(&self) -> bool {
        self.executor.is_some()
    }

    /// Execute one round's calls and append the exchange to the context
    pub(crate) async fn run_tools(&mut self, content: String, calls: Vec<ToolCall>) {
        let Some(executor) = &self.executor else {
            return;
        };

        tracing::info!(count = calls.len(), "executing tool calls");
        let results = executor.execute_tools(&calls).await;

        let replies: Vec<ChatMessage> = calls
            .iter()
            .zip(&results)
            .map(|(call, result)| ChatMessage::tool_result(result, Some(&call.name)))
            .collect();

        self.messages.push(ChatMessage::assistant_tool_calls(content, calls));
        self.messages.extend(replies);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use conduit_llm::FinishReason;

    use super::*;
    use crate::history::InMemoryHistory;
    use crate::test_support::{FakeExecutor, ScriptedProvider, engine_with, text_reply, tool_reply};

    #[tokio::test]
    async fn plain_answer_takes_one_round() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("Hello!")]));
        let (engine, _) = engine_with(&provider, 10);

        let response = engine.chat(ChatRequest::new("hi")).await.unwrap();

        assert_eq!(response.content, "Hello!");
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test]
    async fn tool_round_feeds_results_back_to_the_model() {
        let provider = Arc::new(ScriptedProvider::replying(vec![
            tool_reply("Checking", &[("call_1", "lookup")]),
            text_reply("It is sunny"),
        ]));
        let executor = Arc::new(FakeExecutor::enabled());
        let (engine, _) = engine_with(&provider, 10);
        let engine = engine.with_tools(executor.clone());

        let response = engine.chat(ChatRequest::new("weather?")).await.unwrap();

        assert_eq!(response.content, "It is sunny");
        assert_eq!(executor.batches(), vec![vec!["lookup".to_owned()]]);

        let second = provider.request(1);
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Assistant);
        assert_eq!(second.messages[1].tool_calls().len(), 1);
        assert_eq!(second.messages[2].role, Role::Tool);
        assert_eq!(second.messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second.messages[2].name.as_deref(), Some("lookup"));
        assert_eq!(second.messages[2].content, "result of lookup");
        assert_eq!(second.tool_names, Some(vec!["lookup".to_owned()]));
    }

    #[tokio::test]
    async fn endless_tool_calls_stop_after_exactly_max_rounds() {
        let provider = Arc::new(ScriptedProvider::replying(vec![tool_reply("", &[("c", "lookup")])]));
        let executor = Arc::new(FakeExecutor::enabled());
        let (engine, _) = engine_with(&provider, 3);
        let engine = engine.with_tools(executor.clone());

        let err = engine.chat(ChatRequest::new("loop")).await.unwrap_err();

        assert!(matches!(err, LlmError::MaxToolIterations { max: 3 }));
        assert_eq!(provider.chat_calls(), 3);
        assert_eq!(executor.batches().len(), 2);
    }

    #[tokio::test]
    async fn tools_are_withheld_when_disabled_per_request() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("ok")]));
        let (engine, _) = engine_with(&provider, 10);
        let engine = engine.with_tools(Arc::new(FakeExecutor::enabled()));

        engine.chat(ChatRequest::new("hi").without_tools()).await.unwrap();

        assert_eq!(provider.request(0).tool_names, None);
    }

    #[tokio::test]
    async fn tool_calls_without_an_executor_are_returned_as_is() {
        let provider = Arc::new(ScriptedProvider::replying(vec![tool_reply("", &[("c", "lookup")])]));
        let (engine, _) = engine_with(&provider, 10);

        let response = engine.chat(ChatRequest::new("hi")).await.unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(provider.chat_calls(), 1);
    }

    #[tokio::test]
    async fn request_system_prompt_wins_over_configured_one() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("ok")]));
        let (engine, _) = engine_with(&provider, 10);

        engine.chat(ChatRequest::new("a")).await.unwrap();
        engine
            .chat(ChatRequest::new("b").system_prompt("Be terse."))
            .await
            .unwrap();

        assert_eq!(provider.request(0).system_prompt.as_deref(), Some("You are helpful."));
        assert_eq!(provider.request(1).system_prompt.as_deref(), Some("Be terse."));
    }

    #[tokio::test]
    async fn model_override_builds_a_fresh_provider() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("ok")]));
        let (engine, factory) = engine_with(&provider, 10);

        engine.chat(ChatRequest::new("a")).await.unwrap();
        engine.chat(ChatRequest::new("b")).await.unwrap();
        engine.chat(ChatRequest::new("c").model("small-model")).await.unwrap();

        assert_eq!(factory.built_models(), vec!["claude-sonnet-4-20250514", "small-model"]);
    }

    #[tokio::test]
    async fn health_check_covers_available_providers_in_fallback_order() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("ok")]));
        let (engine, _) = engine_with(&provider, 10);

        let statuses = engine.health_check(None).await;
        let names: Vec<&str> = statuses.keys().map(String::as_str).collect();

        assert_eq!(names, vec!["anthropic", "ollama"]);
        assert!(statuses.values().all(|healthy| *healthy));
        assert_eq!(provider.probes.load(Ordering::SeqCst), 2);

        let single = engine.health_check(Some(ProviderKind::Gemini)).await;
        assert_eq!(single.len(), 1);
        assert_eq!(single.get("gemini"), Some(&true));
    }

    #[tokio::test]
    async fn session_context_is_read_and_extended() {
        let provider = Arc::new(ScriptedProvider::replying(vec![text_reply("first"), text_reply("second")]));
        let (engine, _) = engine_with(&provider, 10);
        let history = InMemoryHistory::new(10, 10);

        engine
            .chat_in_session(&history, "s1", ChatRequest::new("one"))
            .await
            .unwrap();
        engine
            .chat_in_session(&history, "s1", ChatRequest::new("two"))
            .await
            .unwrap();

        let sent: Vec<String> = provider.request(1).messages.into_iter().map(|m| m.content).collect();
        assert_eq!(sent, vec!["one", "first", "two"]);
        assert_eq!(history.get_messages_for_context("s1").await.len(), 4);
    }
}
