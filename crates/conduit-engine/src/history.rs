//! Conversation history collaborator

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use conduit_config::HistoryConfig;
use conduit_llm::{ChatMessage, Role};
use tokio::sync::RwLock;

/// Per-session message store the engine reads context from
///
/// The engine never owns this state; callers pass an implementation in.
#[async_trait]
pub trait ConversationHistory: Send + Sync {
    /// Most recent messages of a session, oldest first
    async fn get_messages_for_context(&self, session_id: &str) -> Vec<ChatMessage>;

    async fn append_message(&self, session_id: &str, role: Role, content: &str);

    /// Forget a session
    async fn clear(&self, session_id: &str);
}

/// Bounded in-process history
pub struct InMemoryHistory {
    sessions: RwLock<HashMap<String, VecDeque<ChatMessage>>>,
    max_messages: usize,
    context_window: usize,
}

impl InMemoryHistory {
    /// Keep at most `max_messages` per session and hand out the last
    /// `context_window` of them
    pub fn new(max_messages: usize, context_window: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_messages,
            context_window,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_messages_per_session, config.context_window)
    }
}

#[async_trait]
impl ConversationHistory for InMemoryHistory {
    async fn get_messages_for_context(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.read().await;
        let Some(messages) = sessions.get(session_id) else {
            return Vec::new();
        };

        let skip = messages.len().saturating_sub(self.context_window);
        messages.iter().skip(skip).cloned().collect()
    }

    async fn append_message(&self, session_id: &str, role: Role, content: &str) {
        let message = ChatMessage {
            role,
            content: content.to_owned(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        };

        let mut sessions = self.sessions.write().await;
        let messages = sessions.entry(session_id.to_owned()).or_default();
        messages.push_back(message);

        while messages.len() > self.max_messages {
            messages.pop_front();
        }
    }

    async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fill(history: &InMemoryHistory, session_id: &str, count: usize) {
        for i in 0..count {
            history.append_message(session_id, Role::User, &format!("m{i}")).await;
        }
    }

    fn contents(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let history = InMemoryHistory::new(5, 5);
        assert!(history.get_messages_for_context("nope").await.is_empty());
    }

    #[tokio::test]
    async fn oldest_messages_are_trimmed() {
        let history = InMemoryHistory::new(3, 10);
        fill(&history, "s", 5).await;

        let messages = history.get_messages_for_context("s").await;
        assert_eq!(contents(&messages), vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn context_is_the_most_recent_window() {
        let history = InMemoryHistory::new(10, 2);
        fill(&history, "s", 4).await;

        let messages = history.get_messages_for_context("s").await;
        assert_eq!(contents(&messages), vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_clearable() {
        let history = InMemoryHistory::from_config(&HistoryConfig::default());
        fill(&history, "a", 2).await;
        fill(&history, "b", 1).await;

        history.clear("a").await;

        assert!(history.get_messages_for_context("a").await.is_empty());
        assert_eq!(history.get_messages_for_context("b").await.len(), 1);
    }
}
