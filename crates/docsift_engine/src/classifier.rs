use std::sync::Arc;
use std::time::Duration;

use docsift_core::{
    build_inclusion_prompt, build_relevance_prompt, content_sample, parse_inclusion_response,
    parse_relevance_response, FilterPolicy, InclusionDecision, INCLUSION_SYSTEM_PROMPT,
};
use engine_logging::{engine_debug, engine_warn};

use crate::llm::{LlmError, TextGenerator};

/// Turns one page into an include/exclude decision via a text-generation call.
///
/// Never fails: transport errors, timeouts and unreadable answers all resolve to
/// "include" with the reason in the explanation.
pub struct InclusionClassifier {
    generator: Arc<dyn TextGenerator>,
    policy: FilterPolicy,
    call_timeout: Option<Duration>,
}

impl InclusionClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            policy: FilterPolicy::Binary,
            call_timeout: None,
        }
    }

    pub fn with_policy(mut self, policy: FilterPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub async fn classify(
        &self,
        url: &str,
        title: &str,
        content: &str,
        target_topic: &str,
    ) -> InclusionDecision {
        let sample = content_sample(content);
        let prompt = match self.policy {
            FilterPolicy::Binary => build_inclusion_prompt(target_topic, url, title, sample),
            FilterPolicy::Threshold(_) => build_relevance_prompt(target_topic, url, title, sample),
        };

        let response = match self.call(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                engine_warn!("Inclusion analysis failed for {}: {}", url, err);
                return InclusionDecision::call_failed(err);
            }
        };

        let decision = match self.policy {
            FilterPolicy::Binary => parse_inclusion_response(&response),
            FilterPolicy::Threshold(threshold) => parse_relevance_response(&response, threshold),
        };
        engine_debug!(
            "Inclusion decision for {}: included={} ({})",
            url,
            decision.included,
            decision.explanation
        );
        decision
    }

    async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let call = self.generator.generate(INCLUSION_SYSTEM_PROMPT, prompt);
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LlmError::Timeout)?,
            None => call.await,
        }
    }
}
