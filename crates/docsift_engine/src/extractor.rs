use std::sync::Arc;

use engine_logging::engine_debug;
use thiserror::Error;

use crate::llm::{LlmError, TextGenerator};
use crate::token::{chunk_by_tokens, TokenCounter, WhitespaceTokenCounter};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("extraction call failed on chunk {chunk}: {source}")]
    Llm {
        chunk: usize,
        #[source]
        source: LlmError,
    },
    #[error("extraction timed out")]
    Timeout,
    #[error("extraction failed: {0}")]
    Other(String),
}

/// The expensive content extraction step.
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Extract ordered text blocks from cleaned HTML.
    async fn extract(&self, html: &str) -> Result<Vec<String>, ExtractError>;
}

/// Extracts markdown blocks by sending the HTML, chunk by chunk, to a model.
pub struct LlmExtractor {
    generator: Arc<dyn TextGenerator>,
    instruction: String,
    chunk_token_threshold: usize,
    token_counter: Box<dyn TokenCounter>,
}

impl LlmExtractor {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        instruction: impl Into<String>,
        chunk_token_threshold: usize,
    ) -> Self {
        Self {
            generator,
            instruction: instruction.into(),
            chunk_token_threshold: chunk_token_threshold.max(1),
            token_counter: Box::new(WhitespaceTokenCounter),
        }
    }

    pub fn with_token_counter(mut self, counter: Box<dyn TokenCounter>) -> Self {
        self.token_counter = counter;
        self
    }

    fn chunks(&self, html: &str) -> Vec<String> {
        if html.trim().is_empty() {
            return Vec::new();
        }
        if self.token_counter.count(html) as usize <= self.chunk_token_threshold {
            return vec![html.to_string()];
        }
        chunk_by_tokens(html, self.chunk_token_threshold)
    }

    fn user_prompt(&self, chunk: &str) -> String {
        format!(
            "{instruction}\n\nHTML content:\n<content>\n{chunk}\n</content>\n\nRespond with the extracted markdown only.",
            instruction = self.instruction,
        )
    }
}

#[async_trait::async_trait]
impl Extractor for LlmExtractor {
    async fn extract(&self, html: &str) -> Result<Vec<String>, ExtractError> {
        let chunks = self.chunks(html);
        engine_debug!("Extracting {} chunk(s)", chunks.len());

        let mut blocks = Vec::with_capacity(chunks.len());
        for (chunk, text) in chunks.iter().enumerate() {
            let prompt = self.user_prompt(text);
            let output = self
                .generator
                .generate("", &prompt)
                .await
                .map_err(|source| ExtractError::Llm { chunk, source })?;

            let output = output.trim();
            if !output.is_empty() {
                blocks.push(output.to_string());
            }
        }
        Ok(blocks)
    }
}
