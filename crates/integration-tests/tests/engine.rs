mod harness;

use std::sync::Arc;

use conduit_config::EngineConfig;
use conduit_engine::{ChatRequest, Engine, TOOL_RESULTS_MARKER};
use conduit_llm::{FinishReason, LlmError, ProviderKind, ProviderRegistry, StreamChunk};
use conduit_tools::ToolGateway;
use futures_util::StreamExt;
use harness::config::{LlmConfigBuilder, tools_config};
use harness::mock_tools::MockToolServer;
use harness::mock_vendor::{MockVendor, Scripted};
use serde_json::{Value, json};

const OPENAI_PATH: &str = "/v1/chat/completions";

fn echo_call_reply() -> Scripted {
    Scripted::json(&json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "echo", "arguments": "{\"text\":\"hello\"}"}
                }]
            },
            "finish_reason": "tool_calls"
        }]
    }))
}

fn final_reply(text: &str) -> Scripted {
    Scripted::json(&json!({
        "id": "chatcmpl-2",
        "model": "gpt-4o",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 20, "completion_tokens": 4, "total_tokens": 24}
    }))
}

fn sse(events: &[Value]) -> Scripted {
    let body: String = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .chain(std::iter::once("data: [DONE]\n\n".to_owned()))
        .collect();
    Scripted::sse_raw(body)
}

fn delta(delta: Value, finish: Option<&str>) -> Value {
    json!({"id": "c", "model": "gpt-4o", "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]})
}

struct Fixture {
    vendor: MockVendor,
    tools: MockToolServer,
    engine: Engine,
}

async fn fixture(max_tool_iterations: usize) -> Fixture {
    let vendor = MockVendor::start().await.unwrap();
    let tools = MockToolServer::start().await.unwrap();

    let config = LlmConfigBuilder::new(ProviderKind::OpenAi)
        .vendor(ProviderKind::OpenAi, &vendor.url("/v1"))
        .build();
    let registry = Arc::new(ProviderRegistry::new(config));

    let gateway = ToolGateway::new(&tools_config(&tools.url())).unwrap();
    gateway.load_tools().await.unwrap();

    let engine_config = EngineConfig {
        max_tool_iterations,
        ..EngineConfig::default()
    };
    let engine = Engine::new(registry, &engine_config).with_tools(Arc::new(gateway));

    Fixture { vendor, tools, engine }
}

#[tokio::test]
async fn chat_runs_a_tool_round_against_the_gateway() {
    let fx = fixture(5).await;
    fx.vendor
        .script(OPENAI_PATH, [echo_call_reply(), final_reply("The tool said hello.")]);

    let response = fx.engine.chat(ChatRequest::new("say hello")).await.unwrap();

    assert_eq!(response.content, "The tool said hello.");
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(fx.vendor.count(OPENAI_PATH), 2);
    assert_eq!(fx.tools.invocations(), 1);

    let requests = fx.vendor.requests();
    assert_eq!(requests[0].body["tools"].as_array().unwrap().len(), 4);

    let messages = requests[1].body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["tool_calls"][0]["id"], "call_1");
    assert_eq!(messages[2]["role"], "tool");
    assert_eq!(messages[2]["tool_call_id"], "call_1");
    assert_eq!(messages[2]["content"], "hello");
}

#[tokio::test]
async fn chat_without_tools_sends_no_definitions() {
    let fx = fixture(5).await;
    fx.vendor.script(OPENAI_PATH, [final_reply("plain")]);

    let response = fx
        .engine
        .chat(ChatRequest::new("hi").without_tools())
        .await
        .unwrap();

    assert_eq!(response.content, "plain");
    assert!(fx.vendor.last_body(OPENAI_PATH).get("tools").is_none());
    assert_eq!(fx.tools.invocations(), 0);
}

#[tokio::test]
async fn chat_stops_at_the_iteration_bound() {
    let fx = fixture(2).await;
    fx.vendor.script(OPENAI_PATH, [echo_call_reply()]);

    let err = fx.engine.chat(ChatRequest::new("loop forever")).await.unwrap_err();

    assert!(matches!(err, LlmError::MaxToolIterations { max: 2 }));
    assert_eq!(fx.vendor.count(OPENAI_PATH), 2);
    assert_eq!(fx.tools.invocations(), 1);
}

#[tokio::test]
async fn stream_marks_the_tool_round_and_finishes_once() {
    let fx = fixture(5).await;
    fx.vendor.script(
        OPENAI_PATH,
        [
            sse(&[
                delta(json!({"role": "assistant", "content": "Checking"}), None),
                delta(
                    json!({"tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "echo", "arguments": "{\"text\":\"hi\"}"}}]}),
                    None,
                ),
                delta(json!({}), Some("tool_calls")),
            ]),
            sse(&[
                delta(json!({"role": "assistant", "content": "All "}), None),
                delta(json!({"content": "done."}), None),
                delta(json!({}), Some("stop")),
            ]),
        ],
    );

    let items: Vec<Result<StreamChunk, LlmError>> = fx
        .engine
        .stream(ChatRequest::new("say hi"))
        .await
        .unwrap()
        .collect()
        .await;
    let chunks: Vec<StreamChunk> = items.into_iter().map(Result::unwrap).collect();

    let text: Vec<&str> = chunks.iter().filter_map(|c| c.content.as_deref()).collect();
    assert_eq!(text, vec!["Checking", TOOL_RESULTS_MARKER, "All ", "done."]);
    assert_eq!(chunks.iter().filter(|c| c.done).count(), 1);
    assert_eq!(chunks.last(), Some(&StreamChunk::done(FinishReason::Stop)));

    assert_eq!(fx.tools.invocations(), 1);
    let messages = fx.vendor.last_body(OPENAI_PATH)["messages"].clone();
    assert_eq!(messages[2]["content"], "hi");
    assert_eq!(fx.vendor.last_body(OPENAI_PATH)["stream"], true);
}

#[tokio::test]
async fn health_check_reports_configured_providers() {
    let fx = fixture(5).await;
    fx.vendor.script(OPENAI_PATH, [final_reply("ok")]);

    let statuses = fx.engine.health_check(Some(ProviderKind::OpenAi)).await;

    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses.get("openai"), Some(&true));
}
