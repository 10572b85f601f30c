use std::path::PathBuf;

use clap::{Parser, Subcommand};
use conduit_llm::ProviderKind;

/// Conduit LLM orchestrator
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Chat with LLM providers through one tool-aware engine")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Log filter, overriding `[telemetry] filter`
    #[arg(long, env = "CONDUIT_LOG")]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one message and print the answer
    Chat {
        message: String,

        /// Provider to use instead of the configured default
        #[arg(short, long)]
        provider: Option<ProviderKind>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,

        /// Do not offer tools to the model
        #[arg(long)]
        no_tools: bool,
    },

    /// Probe provider health
    Health {
        /// Probe only this provider
        #[arg(short, long)]
        provider: Option<ProviderKind>,
    },

    /// List tools offered by the tool endpoint
    Tools,
}
