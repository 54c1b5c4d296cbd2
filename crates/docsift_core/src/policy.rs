use serde::Deserialize;

use crate::decision::{brace_span, InclusionDecision};

/// How the classifier turns a model response into an inclusion decision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FilterPolicy {
    /// Explicit include/exclude verdict.
    #[default]
    Binary,
    /// Continuous relevance score in `0.0..=1.0`; pages scoring at or above the threshold
    /// are included.
    Threshold(f32),
}

pub fn build_relevance_prompt(
    target_topic: &str,
    url: &str,
    title: &str,
    content_sample: &str,
) -> String {
    format!(
        r#"Rate how relevant this web page is to the target topic: "{target_topic}"

Page Details:
- URL: {url}
- Title: {title}
- Content Sample: {content_sample}

Respond in this exact JSON format:
{{
    "relevance_score": 0.0,
    "explanation": "Brief explanation of the score"
}}

"relevance_score" must be a number between 0.0 (unrelated) and 1.0 (exactly on topic).
"#
    )
}

#[derive(Debug, Deserialize)]
struct ScoredVerdict {
    relevance_score: f64,
    explanation: Option<String>,
}

/// Parse a scored response against `threshold`. Anything unparsable is included.
pub fn parse_relevance_response(response: &str, threshold: f32) -> InclusionDecision {
    let scored = brace_span(response)
        .and_then(|json| serde_json::from_str::<ScoredVerdict>(json).ok())
        .filter(|v| v.relevance_score.is_finite());

    match scored {
        Some(verdict) => {
            let score = verdict.relevance_score.clamp(0.0, 1.0);
            let explanation = format!(
                "score {score:.2} (threshold {threshold:.2}): {}",
                verdict
                    .explanation
                    .as_deref()
                    .unwrap_or("No explanation provided")
            );
            InclusionDecision {
                included: score >= f64::from(threshold),
                explanation,
            }
        }
        None => InclusionDecision::include(format!("Could not parse relevance score: {response}")),
    }
}
