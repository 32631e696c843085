//! docplan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main docplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// System prompts sent to the plan generator
    pub prompts: PromptsConfig,

    /// Local cache and document property settings
    pub storage: StorageConfig,

    /// Session behaviour
    pub session: SessionConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        match self.llm.provider.as_str() {
            "openrouter" | "openai" => {}
            other => {
                return Err(eyre::eyre!(
                    "Unknown LLM provider: '{}'. Supported: openrouter, openai",
                    other
                ));
            }
        }
        if self.storage.property_key.trim().is_empty() {
            return Err(eyre::eyre!("storage.property-key must not be empty"));
        }
        if !self.prompts.section_system.contains("{title}") {
            tracing::warn!("prompts.section-system has no {{title}} placeholder");
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .docplan.yml
        let local_config = PathBuf::from(".docplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/docplan/docplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docplan").join("docplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openrouter" or "openai"; both speak the chat completions API)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Sent as `HTTP-Referer` (OpenRouter app attribution)
    pub referer: Option<String>,

    /// Sent as `X-Title` (OpenRouter app attribution)
    #[serde(rename = "app-title")]
    pub app_title: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "openrouter/auto".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: "https://openrouter.ai/api".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
            referer: None,
            app_title: Some("docplan".to_string()),
        }
    }
}

const PLANNER_SYSTEM_PROMPT: &str = r#"You are an expert writing assistant that helps users plan their documents.
The user will provide a description of what they want to write.
Your task is to create a structured document outline with sections and subsections.

IMPORTANT: Your response must be in valid JSON format with the following structure:
{
  "planItems": [
    {
      "title": "Section Title",
      "level": 1,
      "comments": "Detailed instructions for writing this section"
    },
    {
      "title": "Subsection Title",
      "level": 2,
      "comments": "Detailed instructions for writing this subsection"
    }
  ]
}

Guidelines:
1. Level 1 is for main sections, level 2 is for subsections
2. Include 5-15 sections depending on the complexity of the topic
3. For each section, provide detailed comments (50-100 words) explaining what should be included
4. Follow standard academic or professional document structure when appropriate
5. ONLY respond with the JSON, no other text"#;

const UPDATE_SYSTEM_PROMPT: &str = r#"You are an expert writing assistant that helps users update their document plans.
The user will provide their current document plan and a description of how they want to update it.
Your task is to modify the plan according to their request.

IMPORTANT: Your response must be in valid JSON format with the same structure as the input:
{
  "planItems": [
    {
      "title": "Section Title",
      "level": 1,
      "comments": "Detailed instructions for writing this section"
    }
  ]
}

Guidelines:
1. Preserve the existing structure where appropriate
2. You can add, remove, or modify sections as needed
3. Update the comments to reflect the user's new requirements
4. ONLY respond with the JSON, no other text"#;

const SECTION_SYSTEM_PROMPT: &str = "You are an expert writing assistant. You are helping the user write content \
for a document section titled \"{title}\". Please generate well-written, informative content based on the \
user's instructions.";

/// System prompts; `section-system` may use a `{title}` placeholder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Used when generating a brand new plan
    #[serde(rename = "planner-system")]
    pub planner_system: String,

    /// Used when updating the current plan
    #[serde(rename = "update-system")]
    pub update_system: String,

    /// Used when drafting the content of one section
    #[serde(rename = "section-system")]
    pub section_system: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            planner_system: PLANNER_SYSTEM_PROMPT.to_string(),
            update_system: UPDATE_SYSTEM_PROMPT.to_string(),
            section_system: SECTION_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PromptsConfig {
    /// Section prompt with the title substituted
    pub fn section_prompt(&self, title: &str) -> String {
        self.section_system.replace("{title}", title)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the local key-value cache
    #[serde(rename = "cache-dir")]
    pub cache_dir: String,

    /// Document property slot and cache key holding the saved plan
    #[serde(rename = "property-key")]
    pub property_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/docplan/cache on Linux)
        let cache_dir = dirs::data_dir()
            .map(|d| d.join("docplan").join("cache"))
            .unwrap_or_else(|| PathBuf::from(".docplan-cache"))
            .to_string_lossy()
            .into_owned();

        Self {
            cache_dir,
            property_key: "writingPlanData".to_string(),
        }
    }
}

impl StorageConfig {
    /// Cache directory with a leading `~/` expanded
    pub fn cache_path(&self) -> PathBuf {
        if let Some(rest) = self.cache_dir.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(&self.cache_dir)
    }
}

/// Session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum words of section comments before content can be drafted
    #[serde(rename = "min-section-prompt-words")]
    pub min_section_prompt_words: usize,

    /// Produce random statistics when no document host is attached
    #[serde(rename = "simulate-statistics")]
    pub simulate_statistics: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_section_prompt_words: 10,
            simulate_statistics: true,
        }
    }
}
