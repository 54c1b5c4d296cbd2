//! OpenAI-compatible chat completion client and the text-generation seam used by the
//! classifier and the extractor.

use std::time::{Duration, Instant};

use docsift_core::LlmSettings;
use engine_logging::{engine_debug, engine_warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm configuration error: {0}")]
    Config(String),
    #[error("llm network error: {0}")]
    Network(String),
    #[error("llm request timed out")]
    Timeout,
    #[error("llm api returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response could not be parsed: {0}")]
    Parse(String),
}

/// A single prompt-in, text-out model call.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    settings: LlmSettings,
    api_key: String,
    max_tokens: Option<u32>,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(settings: LlmSettings, request_timeout: Duration) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Config("OPENAI_API_KEY not set in environment or .env file".into())
            })?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|err| LlmError::Config(err.to_string()))?;
        Ok(Self {
            settings,
            api_key,
            max_tokens: None,
            http,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn build_request<'a>(&'a self, system: &str, user: &str) -> ChatRequest<'a> {
        let model = self.settings.model_name();
        if self.settings.is_reasoning_model() {
            // No system role, temperature or max_tokens for reasoning models.
            let combined = if system.is_empty() {
                user.to_string()
            } else {
                format!("{system}\n\n{user}")
            };
            return ChatRequest {
                model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: combined,
                }],
                temperature: None,
                max_tokens: None,
            };
        }

        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user.to_string(),
        });
        ChatRequest {
            model,
            messages,
            temperature: Some(self.settings.temperature),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let started = Instant::now();
        let request = self.build_request(system, user);
        let endpoint = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            engine_warn!("LLM api error status={} body={}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Parse(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Parse("response has no message content".into()))?;

        engine_debug!(
            "LLM completion model={} duration_ms={}",
            request.model,
            started.elapsed().as_millis()
        );
        Ok(content.trim().to_string())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        return LlmError::Timeout;
    }
    if err.is_decode() {
        return LlmError::Parse(err.to_string());
    }
    LlmError::Network(err.to_string())
}
