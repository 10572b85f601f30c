use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Credential was missing or rejected by the vendor
    #[error("{provider}: authentication failed")]
    Authentication { provider: String },

    /// Vendor is throttling requests
    #[error("{provider}: rate limit exceeded")]
    RateLimited {
        provider: String,
        /// Seconds to wait before retrying, when the vendor says
        retry_after: Option<u64>,
    },

    /// Prompt does not fit into the model context window
    #[error("{provider}: context length exceeded")]
    ContextTooLong {
        provider: String,
        /// Context window size reported by the vendor
        max_tokens: Option<u64>,
        /// Tokens the request would have used
        requested_tokens: Option<u64>,
    },

    /// Any other vendor or transport failure
    #[error("{provider}: {message}")]
    Provider {
        provider: String,
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        message: String,
    },

    /// Every fallback candidate failed its health probe
    #[error("no healthy provider available (tried: {})", .tried.join(", "))]
    NoHealthyProvider { tried: Vec<String> },

    /// Tool loop did not converge
    #[error("tool loop did not finish within {max} iterations")]
    MaxToolIterations { max: usize },

    /// Provider could not be constructed from its settings
    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Name of the provider that produced this error, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Authentication { provider }
            | Self::RateLimited { provider, .. }
            | Self::ContextTooLong { provider, .. }
            | Self::Provider { provider, .. } => Some(provider),
            Self::NoHealthyProvider { .. } | Self::MaxToolIterations { .. } | Self::Configuration(_) => None,
        }
    }

    /// Whether a caller-side retry could plausibly succeed
    ///
    /// The core never retries on its own.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Provider { status: None, .. } => true,
            Self::Provider {
                status: Some(status), ..
            } => *status >= 500,
            _ => false,
        }
    }

    /// Transport-level failure before any response arrived
    pub(crate) fn transport(provider: &str, error: &reqwest::Error) -> Self {
        tracing::error!(provider, error = %error, "upstream request failed");
        Self::Provider {
            provider: provider.to_owned(),
            status: None,
            message: format!("request failed: {error}"),
        }
    }

    /// Response body could not be decoded
    pub(crate) fn decode(provider: &str, error: impl std::fmt::Display) -> Self {
        Self::Provider {
            provider: provider.to_owned(),
            status: None,
            message: format!("failed to parse response: {error}"),
        }
    }

    /// Stream broke after the response started
    pub(crate) fn interrupted(provider: &str, error: impl std::fmt::Display) -> Self {
        tracing::error!(provider, error = %error, "upstream stream interrupted");
        Self::Provider {
            provider: provider.to_owned(),
            status: None,
            message: format!("stream interrupted: {error}"),
        }
    }

    /// Consume a non-success response and classify it
    pub(crate) async fn from_response(provider: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();

        tracing::warn!(provider, status = %status, "upstream returned error");

        classify(provider, status.as_u16(), retry_after, &body)
    }
}

/// Map an HTTP failure onto the error taxonomy
pub(crate) fn classify(provider: &str, status: u16, retry_after: Option<u64>, body: &str) -> LlmError {
    let message = error_message(body);
    let provider = provider.to_owned();

    match status {
        401 | 403 => LlmError::Authentication { provider },
        429 => LlmError::RateLimited { provider, retry_after },
        400 | 413 if mentions_context_overflow(&message) => {
            let (max_tokens, requested_tokens) = context_token_counts(&message);
            LlmError::ContextTooLong {
                provider,
                max_tokens,
                requested_tokens,
            }
        }
        _ => LlmError::Provider {
            provider,
            status: Some(status),
            message,
        },
    }
}

/// Parse a `retry-after` header given in (possibly fractional) seconds
fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    value.parse::<u64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let rounded = secs.ceil() as u64;
                rounded
            })
    })
}

/// Pull the human-readable message out of a vendor error body
///
/// Vendors wrap it as `{"error": {"message": ..}}`, `{"error": ".."}` or
/// `{"message": ..}`; anything else is returned verbatim.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_owned();
    };

    value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| body.trim().to_owned(), ToOwned::to_owned)
}

fn mentions_context_overflow(message: &str) -> bool {
    const MARKERS: [&str; 6] = [
        "prompt is too long",
        "context_length_exceeded",
        "maximum context length",
        "context window",
        "exceeds the maximum number of tokens",
        "context length",
    ];

    let lowered = message.to_ascii_lowercase();
    MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Extract `(max, requested)` token counts from a context-overflow message
fn context_token_counts(message: &str) -> (Option<u64>, Option<u64>) {
    // (pattern, whether the requested count is captured first)
    fn patterns() -> &'static [(Regex, bool)] {
        static PATTERNS: OnceLock<Vec<(Regex, bool)>> = OnceLock::new();
        PATTERNS.get_or_init(|| {
            vec![
                (
                    Regex::new(r"(\d+) tokens > (\d+) maximum").expect("must be valid regex"),
                    true,
                ),
                (
                    Regex::new(r"maximum context length is (\d+) tokens.*?(?:resulted in|requested) (\d+) tokens")
                        .expect("must be valid regex"),
                    false,
                ),
                (
                    Regex::new(r"input token count \((\d+)\) exceeds the maximum number of tokens allowed \((\d+)\)")
                        .expect("must be valid regex"),
                    true,
                ),
            ]
        })
    }

    for (pattern, requested_first) in patterns() {
        if let Some(captures) = pattern.captures(message) {
            let first = captures.get(1).and_then(|m| m.as_str().parse().ok());
            let second = captures.get(2).and_then(|m| m.as_str().parse().ok());
            return if *requested_first {
                (second, first)
            } else {
                (first, second)
            };
        }
    }

    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err = classify("openai", 401, None, r#"{"error":{"message":"Incorrect API key"}}"#);
        assert!(matches!(err, LlmError::Authentication { ref provider } if provider == "openai"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn too_many_requests_carries_retry_hint() {
        let err = classify("anthropic", 429, Some(30), "{}");
        assert!(matches!(
            err,
            LlmError::RateLimited {
                retry_after: Some(30),
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn anthropic_prompt_too_long_extracts_counts() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"prompt is too long: 208310 tokens > 200000 maximum"}}"#;
        let err = classify("anthropic", 400, None, body);
        assert!(matches!(
            err,
            LlmError::ContextTooLong {
                max_tokens: Some(200_000),
                requested_tokens: Some(208_310),
                ..
            }
        ));
    }

    #[test]
    fn openai_context_length_extracts_counts() {
        let body = r#"{"error":{"message":"This model's maximum context length is 128000 tokens. However, your messages resulted in 130500 tokens. Please reduce the length of the messages.","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
        let err = classify("openai", 400, None, body);
        assert!(matches!(
            err,
            LlmError::ContextTooLong {
                max_tokens: Some(128_000),
                requested_tokens: Some(130_500),
                ..
            }
        ));
    }

    #[test]
    fn gemini_token_overflow_extracts_counts() {
        let body = r#"{"error":{"code":400,"message":"The input token count (1050000) exceeds the maximum number of tokens allowed (1048576).","status":"INVALID_ARGUMENT"}}"#;
        let err = classify("gemini", 400, None, body);
        assert!(matches!(
            err,
            LlmError::ContextTooLong {
                max_tokens: Some(1_048_576),
                requested_tokens: Some(1_050_000),
                ..
            }
        ));
    }

    #[test]
    fn other_bad_request_is_provider_error_with_message() {
        let err = classify("ollama", 400, None, r#"{"error":"model 'nope' not found"}"#);
        match err {
            LlmError::Provider { status, message, .. } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "model 'nope' not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(classify("openai", 503, None, "overloaded").is_retryable());
        assert!(!classify("openai", 404, None, "missing").is_retryable());
    }

    #[test]
    fn retry_after_accepts_fractional_seconds() {
        assert_eq!(parse_retry_after("12"), Some(12));
        assert_eq!(parse_retry_after("1.2"), Some(2));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn no_healthy_provider_lists_candidates() {
        let err = LlmError::NoHealthyProvider {
            tried: vec!["anthropic".to_owned(), "openai".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "no healthy provider available (tried: anthropic, openai)"
        );
    }
}
