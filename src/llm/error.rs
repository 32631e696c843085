//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised while asking the model for a completion
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Non-success HTTP status; `message` is the upstream `error.message` when present
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("The model returned no content")]
    EmptyCompletion,

    #[error("Unknown LLM provider: '{0}'. Supported: openrouter, openai")]
    UnknownProvider(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Transient failures: rate limits, timeouts, dropped connections and 408/5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } | LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::ApiError { status, .. } => *status == 408 || *status >= 500,
            LlmError::InvalidResponse(_)
            | LlmError::EmptyCompletion
            | LlmError::UnknownProvider(_)
            | LlmError::Json(_) => false,
        }
    }

    /// Message reported by the upstream API, when there is one
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            LlmError::ApiError { message, .. } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> LlmError {
        LlmError::ApiError {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_is_retryable() {
        let rate_limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert!(rate_limited.is_retryable());
        assert!(rate_limited.is_rate_limit());

        assert!(api(502, "Bad gateway").is_retryable());
        assert!(api(408, "Request timeout").is_retryable());
        assert!(!api(401, "No auth credentials found").is_retryable());
        assert!(!api(402, "Insufficient credits").is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::EmptyCompletion.is_retryable());
        assert!(!LlmError::UnknownProvider("anthropic".to_string()).is_retryable());
    }

    #[test]
    fn test_upstream_message() {
        assert_eq!(
            api(401, "No auth credentials found").upstream_message(),
            Some("No auth credentials found")
        );
        assert_eq!(api(500, "  ").upstream_message(), None);
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).upstream_message(), None);
    }

    #[test]
    fn test_unknown_provider_message() {
        let err = LlmError::UnknownProvider("anthropic".to_string());
        assert_eq!(err.to_string(), "Unknown LLM provider: 'anthropic'. Supported: openrouter, openai");
    }
}
