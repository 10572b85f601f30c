//! Mock tool-execution endpoint
//!
//! Tools:
//! - `echo`: returns the `text` argument as a plain string
//! - `blocks`: returns a list of text blocks
//! - `slow`: waits before answering, to shuffle completion order
//! - `broken`: answers 500
//!
//! Anything else is a 404.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct ToolServerState {
    listings: AtomicU32,
    invocations: AtomicU32,
    unhealthy: AtomicBool,
}

pub struct MockToolServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<ToolServerState>,
}

impl MockToolServer {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(ToolServerState::default());

        let app = Router::new()
            .route("/tools", routing::get(list_tools))
            .route("/tools/{name}", routing::post(invoke_tool))
            .route("/health", routing::get(health))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_unhealthy(&self) {
        self.state.unhealthy.store(true, Ordering::Relaxed);
    }

    pub fn listings(&self) -> u32 {
        self.state.listings.load(Ordering::Relaxed)
    }

    pub fn invocations(&self) -> u32 {
        self.state.invocations.load(Ordering::Relaxed)
    }
}

impl Drop for MockToolServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn list_tools(State(state): State<Arc<ToolServerState>>) -> impl IntoResponse {
    state.listings.fetch_add(1, Ordering::Relaxed);

    Json(json!({
        "tools": [
            {
                "name": "echo",
                "description": "Echo the given text",
                "inputSchema": {
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }
            },
            {"name": "blocks", "description": "Return text blocks"},
            {"name": "slow"},
            {"name": "broken", "description": "Always fails"}
        ]
    }))
}

async fn invoke_tool(
    State(state): State<Arc<ToolServerState>>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.invocations.fetch_add(1, Ordering::Relaxed);
    let arguments = body.get("arguments").cloned().unwrap_or(Value::Null);

    match name.as_str() {
        "echo" => {
            let text = arguments.get("text").and_then(Value::as_str).unwrap_or_default();
            (StatusCode::OK, Json(json!({"content": text, "isError": false})))
        }
        "blocks" => (
            StatusCode::OK,
            Json(json!({
                "content": [
                    {"type": "text", "text": "first"},
                    {"type": "image", "data": "..."},
                    {"type": "text", "text": "second"}
                ]
            })),
        ),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(150)).await;
            (StatusCode::OK, Json(json!({"content": "slow done"})))
        }
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "tool crashed"})),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown tool"}))),
    }
}

async fn health(State(state): State<Arc<ToolServerState>>) -> StatusCode {
    if state.unhealthy.load(Ordering::Relaxed) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}
