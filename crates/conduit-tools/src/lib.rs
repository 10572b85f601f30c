//! Tool execution for Conduit
//!
//! A registry of tool definitions loaded from an external tool-execution
//! endpoint, and a gateway that fans tool calls out to it concurrently.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod executor;
pub mod gateway;
mod protocol;
pub mod registry;
pub mod schema;

pub use error::GatewayError;
pub use executor::ToolExecutor;
pub use gateway::ToolGateway;
pub use registry::ToolRegistry;
pub use schema::{merge_tool_schemas, validate_tool_arguments};
