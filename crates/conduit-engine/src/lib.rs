//! Orchestration engine for Conduit
//!
//! Drives one request end to end: resolves a provider, offers tools,
//! executes the calls the model asks for, and feeds the results back until
//! the model answers or the round limit is hit. Works both as a single
//! response and as a chunk stream.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod engine;
pub mod history;
pub mod request;
mod stream;
#[cfg(test)]
mod test_support;

pub use engine::Engine;
pub use history::{ConversationHistory, InMemoryHistory};
pub use request::ChatRequest;
pub use stream::TOOL_RESULTS_MARKER;
