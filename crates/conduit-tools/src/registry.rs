use conduit_llm::ToolDefinition;
use indexmap::IndexMap;
use tokio::sync::RwLock;

/// Tool definitions known to the gateway, in load order
///
/// Shared across concurrent requests. Readers take the read lock; a reload
/// swaps the whole map under the write lock.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<IndexMap<String, ToolDefinition>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a single tool, returning the previous definition
    pub async fn register(&self, tool: ToolDefinition) -> Option<ToolDefinition> {
        self.tools.write().await.insert(tool.name.clone(), tool)
    }

    /// Replace the whole registry; later duplicates win
    pub async fn replace_all(&self, tools: Vec<ToolDefinition>) {
        let map = tools.into_iter().map(|tool| (tool.name.clone(), tool)).collect();
        *self.tools.write().await = map;
    }

    pub async fn get(&self, name: &str) -> Option<ToolDefinition> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn list(&self) -> Vec<ToolDefinition> {
        self.tools.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }
}
