//! Scriptable mock of a vendor LLM API
//!
//! Every request is recorded and answered from a per-path script. The last
//! scripted response for a path repeats; unscripted paths get 404.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Canned HTTP response
#[derive(Debug, Clone)]
pub struct Scripted {
    status: StatusCode,
    content_type: &'static str,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl Scripted {
    pub fn json(body: &Value) -> Self {
        Self::json_status(200, body)
    }

    pub fn json_status(status: u16, body: &Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: "application/json",
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Server-sent events, one `data:` line per payload
    pub fn sse(events: &[Value]) -> Self {
        let body: String = events.iter().map(|event| format!("data: {event}\n\n")).collect();
        Self::sse_raw(body)
    }

    pub fn sse_raw(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/event-stream",
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Newline-delimited JSON, one object per line
    pub fn ndjson(lines: &[Value]) -> Self {
        let body: String = lines.iter().map(|line| format!("{line}\n")).collect();
        Self {
            status: StatusCode::OK,
            content_type: "application/x-ndjson",
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

impl IntoResponse for Scripted {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        for (name, value) in self.headers {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_str(&value).unwrap());
        }

        (self.status, headers, self.body).into_response()
    }
}

/// One request as the vendor saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Default)]
struct VendorState {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<Recorded>>,
}

/// Mock vendor server bound to an ephemeral local port
pub struct MockVendor {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<VendorState>,
}

impl MockVendor {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(VendorState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

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

    /// Base URL with `prefix` appended, e.g. `/v1`
    pub fn url(&self, prefix: &str) -> String {
        format!("http://{}{prefix}", self.addr)
    }

    /// Queue responses for `path`; the last one repeats
    pub fn script(&self, path: &str, responses: impl IntoIterator<Item = Scripted>) {
        self.state
            .scripts
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default()
            .extend(responses);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests received on `path`
    pub fn count(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    /// Body of the last request received on `path`
    pub fn last_body(&self, path: &str) -> Value {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|request| request.path == path)
            .map(|request| request.body.clone())
            .unwrap_or(Value::Null)
    }
}

impl Drop for MockVendor {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<VendorState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_owned();

    state.requests.lock().unwrap().push(Recorded {
        path: path.clone(),
        query: uri.query().map(ToOwned::to_owned),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let response = {
        let mut scripts = state.scripts.lock().unwrap();
        scripts.get_mut(&path).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        })
    };

    match response {
        Some(scripted) => scripted.into_response(),
        None => Scripted::json_status(404, &serde_json::json!({"error": {"message": format!("no script for {path}")}}))
            .into_response(),
    }
}
