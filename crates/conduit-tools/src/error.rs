use thiserror::Error;

/// Failures talking to the tool-execution endpoint
///
/// Tool execution never returns these; they are folded into error results.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Gateway is turned off in configuration
    #[error("tool execution is disabled")]
    Disabled,

    /// Request never produced a response
    #[error("request to tool endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("tool endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("invalid tool endpoint response: {0}")]
    InvalidResponse(String),
}
