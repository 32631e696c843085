//! LLM client module for docplan
//!
//! A thin OpenAI-compatible completion client used by the plan generator.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client for the configured provider
///
/// Supports "openrouter" and "openai"; both speak the chat completions API.
pub fn create_client(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openrouter" | "openai" => Ok(Arc::new(OpenAIClient::new(config, api_key)?)),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::UnknownProvider(other.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_known_providers() {
        let mut config = LlmConfig::default();
        assert!(create_client(&config, "key").is_ok());
        config.provider = "openai".to_string();
        assert!(create_client(&config, "key").is_ok());
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_client(&config, "key"), Err(LlmError::UnknownProvider(_))));
    }
}
