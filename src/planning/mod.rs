//! Plan generation
//!
//! ```text
//! prompt → PlanGenerator (LLM) → raw text → extract_sections → ProposedItem[]
//! ```
//!
//! The generator only turns prompts into text. Choosing prompts and
//! recovering sections from whatever the model answered live here too, so
//! the session never sees raw model output.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

pub mod extract;
pub mod prompts;

pub use extract::{Extraction, ExtractionSource, extract_sections};
pub use prompts::update_prompt;

use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient, LlmError, create_client};

/// Turns a system prompt and a user prompt into raw model text
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str, model: &str) -> Result<String, LlmError>;
}

/// [`PlanGenerator`] backed by an [`LlmClient`]
pub struct LlmPlanGenerator {
    client: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmPlanGenerator {
    pub fn new(client: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    /// Build the configured provider's client with the given key
    pub fn from_config(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        Ok(Self::new(create_client(config, api_key)?, config.max_tokens))
    }
}

#[async_trait]
impl PlanGenerator for LlmPlanGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str, model: &str) -> Result<String, LlmError> {
        debug!(%model, prompt_len = %user_prompt.len(), "LlmPlanGenerator::generate: called");
        let request = CompletionRequest::single(system_prompt, user_prompt, self.max_tokens).with_model(model);
        let response = self.client.complete(request).await?;
        match response.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyCompletion),
        }
    }
}
