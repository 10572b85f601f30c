use conduit_llm::{ChatMessage, ProviderKind};

/// One caller request to the engine
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// New user message
    pub message: String,
    /// System prompt, falling back to the engine's configured one
    pub system_prompt: Option<String>,
    /// Earlier turns, oldest first
    pub history: Vec<ChatMessage>,
    /// Provider to use instead of the configured default
    pub provider: Option<ProviderKind>,
    /// Model override; always served by a fresh provider instance
    pub model: Option<String>,
    /// Whether tools are offered to the model
    pub use_tools: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_prompt: None,
            history: Vec::new(),
            provider: None,
            model: None,
            use_tools: true,
        }
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub const fn provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub const fn without_tools(mut self) -> Self {
        self.use_tools = false;
        self
    }

    /// Conversation sent in the first round: history then the new message
    pub(crate) fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(self.message.clone()));
        messages
    }
}
