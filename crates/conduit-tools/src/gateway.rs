use std::time::Duration;

use async_trait::async_trait;
use conduit_config::ToolsConfig;
use conduit_llm::{ToolCall, ToolDefinition, ToolResult};
use reqwest::Client;
use url::Url;

use crate::error::GatewayError;
use crate::executor::ToolExecutor;
use crate::protocol::{InvokeRequest, InvokeResponse, ToolListing};
use crate::registry::ToolRegistry;

/// Message carried by every result while the gateway is turned off
const DISABLED_MESSAGE: &str = "tool execution is not available";

/// Client for the external tool-execution endpoint
///
/// Owns the tool registry populated by [`load_tools`](Self::load_tools).
/// Execution never fails as a whole: transport errors, unknown tools and
/// a disabled gateway all become error results for the affected call.
pub struct ToolGateway {
    client: Client,
    base_url: Url,
    enabled: bool,
    registry: ToolRegistry,
}

impl ToolGateway {
    /// Create a gateway from configuration
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &ToolsConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            enabled: config.enabled,
            registry: ToolRegistry::new(),
        })
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Endpoint URL with percent-encoded path segments appended
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Load tools at startup, logging instead of failing
    pub async fn initialize(&self) {
        if !self.enabled {
            tracing::info!("tool gateway disabled");
            return;
        }

        if let Err(e) = self.load_tools().await {
            tracing::warn!(error = %e, "failed to load tools, continuing without them");
        }
    }

    /// Fetch the tool list and replace the registry with it
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is disabled, the endpoint cannot be
    /// reached, or its response is malformed. The registry is left as is.
    pub async fn load_tools(&self) -> Result<Vec<ToolDefinition>, GatewayError> {
        if !self.enabled {
            return Err(GatewayError::Disabled);
        }

        let response = self.client.get(self.endpoint(&["tools"])).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let listing: ToolListing = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let tools: Vec<ToolDefinition> = listing
            .into_tools()
            .into_iter()
            .map(|remote| {
                ToolDefinition::new(
                    remote.name,
                    remote.description.unwrap_or_default(),
                    remote
                        .input_schema
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                )
            })
            .collect();

        self.registry.replace_all(tools.clone()).await;
        tracing::info!(count = tools.len(), "loaded tools");

        Ok(tools)
    }

    /// Execute one call
    pub async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        if !self.enabled {
            return ToolResult::error(&call.id, DISABLED_MESSAGE);
        }

        tracing::info!(tool = %call.name, tool_call_id = %call.id, "invoking tool");

        match self.invoke(call).await {
            Ok(result) => {
                tracing::debug!(tool = %call.name, is_error = result.is_error, len = result.content.len(), "tool finished");
                result
            }
            Err(GatewayError::Status { status: 404, .. }) => {
                tracing::warn!(tool = %call.name, "tool not found");
                ToolResult::error(&call.id, format!("Tool '{}' not found", call.name))
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolResult::error(&call.id, format!("Tool execution failed: {e}"))
            }
        }
    }

    async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(&["tools", &call.name]))
            .json(&InvokeRequest {
                arguments: &call.arguments,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: InvokeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(ToolResult {
            tool_call_id: call.id.clone(),
            content: body.content.flatten(),
            is_error: body.is_error,
        })
    }

    /// Execute a batch concurrently; results keep the order of `calls`
    pub async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        futures_util::future::join_all(calls.iter().map(|call| self.execute_tool(call))).await
    }

    /// Whether the endpoint answers `GET /health`
    ///
    /// A disabled gateway has nothing to probe and reports healthy.
    pub async fn health(&self) -> bool {
        if !self.enabled {
            return true;
        }

        match self.client.get(self.endpoint(&["health"])).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "tool gateway health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolGateway {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn tools(&self) -> Vec<ToolDefinition> {
        self.registry.list().await
    }

    async fn execute_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        Self::execute_tools(self, calls).await
    }
}
