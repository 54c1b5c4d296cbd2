use thiserror::Error;

use crate::policy::FilterPolicy;

pub const DEFAULT_EXTRACTION_INSTRUCTION: &str = r#"Extract the complete API documentation from this page while preserving its original structure and content.

Focus on:
1. Function and method definitions with their complete signatures
2. Parameters, their types and descriptions
3. Return values and their types
4. Class and object definitions with their properties and methods
5. Code examples and usage patterns
6. Notes, warnings and best practices
7. Authentication or configuration requirements

Format the output as clean markdown:
- Code blocks for all code examples, with syntax highlighting hints
- Signatures in their own code blocks
- Hierarchical headers
- Tables for parameter descriptions where appropriate

Leave out navigation menus, breadcrumbs, search bars, version selectors, unrelated footers,
advertisements and other UI elements that do not help understanding the API."#;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_depth must be at least 1")]
    MaxDepth,
    #[error("max_pages must be at least 1")]
    MaxPages,
    #[error("keyword weight must be between 0 and 1, got {0}")]
    KeywordWeight(f32),
    #[error("{role} provider must not be empty")]
    EmptyProvider { role: &'static str },
    #[error("{role} temperature must be between 0 and 1, got {value}")]
    Temperature { role: &'static str, value: f32 },
    #[error("extraction instruction must not be empty")]
    EmptyInstruction,
    #[error("chunk token threshold must be at least 1")]
    ChunkThreshold,
    #[error("--target-topic is required when --enable-filtering is set")]
    MissingTargetTopic,
    #[error("relevance threshold must be between 0 and 1, got {0}")]
    RelevanceThreshold(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    pub max_depth: u32,
    pub max_pages: usize,
    pub include_external: bool,
    /// Keywords that pull matching URLs to the front of the crawl frontier.
    pub keywords: Vec<String>,
    pub keyword_weight: f32,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 25,
            include_external: false,
            keywords: Vec::new(),
            keyword_weight: 0.7,
        }
    }
}

impl CrawlSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth < 1 {
            return Err(ConfigError::MaxDepth);
        }
        if self.max_pages < 1 {
            return Err(ConfigError::MaxPages);
        }
        if !(0.0..=1.0).contains(&self.keyword_weight) {
            return Err(ConfigError::KeywordWeight(self.keyword_weight));
        }
        Ok(())
    }
}

/// Settings for one text-generation model (extraction or filtering).
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    /// `vendor/model`, e.g. `openai/gpt-4o`.
    pub provider: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub base_url: String,
    pub instruction: String,
    pub chunk_token_threshold: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai/gpt-4o".to_string(),
            temperature: 0.1,
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            instruction: DEFAULT_EXTRACTION_INSTRUCTION.to_string(),
            chunk_token_threshold: 2_048,
        }
    }
}

impl LlmSettings {
    /// Defaults for the classifier model: a small, deterministic model.
    pub fn filter_default() -> Self {
        Self {
            provider: "openai/gpt-4o-mini".to_string(),
            temperature: 0.0,
            ..Self::default()
        }
    }

    /// Model name as sent to the API: the part after the last `/`.
    pub fn model_name(&self) -> &str {
        self.provider
            .rsplit('/')
            .next()
            .unwrap_or(self.provider.as_str())
    }

    /// Reasoning models reject system messages, temperature and max_tokens.
    pub fn is_reasoning_model(&self) -> bool {
        self.model_name().to_lowercase().contains("o1")
    }

    pub fn validate(&self, role: &'static str) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::EmptyProvider { role });
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature {
                role,
                value: self.temperature,
            });
        }
        if self.instruction.trim().is_empty() {
            return Err(ConfigError::EmptyInstruction);
        }
        if self.chunk_token_threshold == 0 {
            return Err(ConfigError::ChunkThreshold);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSettings {
    pub enabled: bool,
    pub target_topic: Option<String>,
    pub policy: FilterPolicy,
}

impl FilterSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.active_topic().is_none() {
            return Err(ConfigError::MissingTargetTopic);
        }
        if let FilterPolicy::Threshold(t) = self.policy {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::RelevanceThreshold(t));
            }
        }
        Ok(())
    }

    /// The topic to classify against, only when filtering is switched on.
    pub fn active_topic(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.target_topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}
