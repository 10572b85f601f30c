#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::sync::Arc;

use args::{Args, Command};
use clap::Parser;
use conduit_config::Config;
use conduit_engine::{ChatRequest, Engine};
use conduit_llm::ProviderRegistry;
use conduit_tools::ToolGateway;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    conduit_telemetry::init(config.telemetry.as_ref(), args.log_filter.as_deref())?;

    tracing::debug!(config_path = %args.config.display(), "configuration loaded");

    let gateway = Arc::new(ToolGateway::new(&config.tools)?);
    let registry = Arc::new(ProviderRegistry::new(config.llm));
    let engine = Engine::new(registry, &config.engine).with_tools(gateway.clone());

    match args.command {
        Command::Chat {
            message,
            provider,
            model,
            system,
            stream,
            no_tools,
        } => {
            let mut request = ChatRequest::new(message);
            request.provider = provider;
            request.model = model;
            request.system_prompt = system;
            request.use_tools = !no_tools;

            if request.use_tools {
                gateway.initialize().await;
            }

            if stream {
                stream_chat(&engine, request).await?;
            } else {
                let response = engine.chat(request).await?;
                println!("{}", response.content);
            }
        }
        Command::Health { provider } => {
            for (name, healthy) in engine.health_check(provider).await {
                println!("{name}: {}", status_label(healthy));
            }

            if provider.is_none() && gateway.is_enabled() {
                println!("tools: {}", status_label(gateway.health().await));
            }
        }
        Command::Tools => {
            for tool in gateway.load_tools().await? {
                if tool.description.is_empty() {
                    println!("{}", tool.name);
                } else {
                    println!("{}: {}", tool.name, tool.description);
                }
            }
        }
    }

    Ok(())
}

/// Write text chunks to stdout as they arrive
async fn stream_chat(engine: &Engine, request: ChatRequest) -> anyhow::Result<()> {
    let mut chunks = engine.stream(request).await?;
    let mut stdout = tokio::io::stdout();

    while let Some(chunk) = chunks.next().await {
        if let Some(text) = chunk?.content {
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

const fn status_label(healthy: bool) -> &'static str {
    if healthy { "healthy" } else { "unhealthy" }
}
