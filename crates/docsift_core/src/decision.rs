use serde::{Deserialize, Serialize};

/// Number of characters of cleaned content sent to the classifier.
pub const CONTENT_SAMPLE_CHARS: usize = 2_000;

pub const INCLUSION_SYSTEM_PROMPT: &str =
    "You are an expert at analyzing web content for documentation inclusion decisions.";

/// Binary include/exclude verdict for one page, with the model's rationale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionDecision {
    pub included: bool,
    pub explanation: String,
}

impl InclusionDecision {
    pub fn include(explanation: impl Into<String>) -> Self {
        Self {
            included: true,
            explanation: explanation.into(),
        }
    }

    pub fn exclude(explanation: impl Into<String>) -> Self {
        Self {
            included: false,
            explanation: explanation.into(),
        }
    }

    /// Fail-open verdict used when the classifier call itself did not complete.
    pub fn call_failed(reason: impl std::fmt::Display) -> Self {
        Self::include(format!("Analysis failed: {reason}"))
    }
}

/// Character-bounded prefix of `content`, never splitting a code point.
pub fn content_sample(content: &str) -> &str {
    match content.char_indices().nth(CONTENT_SAMPLE_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

pub fn build_inclusion_prompt(
    target_topic: &str,
    url: &str,
    title: &str,
    content_sample: &str,
) -> String {
    format!(
        r#"Analyze this web page and decide whether to INCLUDE or EXCLUDE it for the target topic: "{target_topic}"

Page Details:
- URL: {url}
- Title: {title}
- Content Sample: {content_sample}

Make a binary decision based on relevance to the target topic.

Respond in this exact JSON format:
{{
    "decision": "include",
    "explanation": "Brief explanation of why this page should be included or excluded"
}}

The "decision" field must be exactly "include" or "exclude".

Consider:
- Does the content directly address the target topic?
- Are there specific technical details related to the target?
- Is this a navigation page or actual documentation content?
- Do the URL path and title suggest relevant content?
"#
    )
}

#[derive(Debug, Deserialize)]
struct StructuredVerdict {
    decision: Option<String>,
    explanation: Option<String>,
}

/// Turn free-form model output into a decision.
///
/// Tiers, first match wins:
/// 1. a `{...}` span (first `{` to last `}`) parsing as JSON whose `decision` is
///    `include` or `exclude`;
/// 2. a case-insensitive keyword scan where exactly one of the two words appears;
/// 3. otherwise include, with the ambiguity recorded in the explanation.
pub fn parse_inclusion_response(response: &str) -> InclusionDecision {
    if let Some(decision) = parse_structured(response) {
        return decision;
    }
    scan_keywords(response)
}

fn parse_structured(response: &str) -> Option<InclusionDecision> {
    let json = brace_span(response)?;
    let verdict: StructuredVerdict = serde_json::from_str(json).ok()?;
    let decision = verdict.decision?.trim().to_lowercase();
    let included = match decision.as_str() {
        "include" => true,
        "exclude" => false,
        _ => return None,
    };
    let explanation = verdict
        .explanation
        .unwrap_or_else(|| "No explanation provided".to_string());
    Some(InclusionDecision {
        included,
        explanation,
    })
}

pub(crate) fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn scan_keywords(response: &str) -> InclusionDecision {
    let lower = response.to_lowercase();
    let has_include = lower.contains("include");
    let has_exclude = lower.contains("exclude");
    match (has_include, has_exclude) {
        (true, false) => InclusionDecision::include(response),
        (false, true) => InclusionDecision::exclude(response),
        _ => InclusionDecision::include(format!("Could not parse clear decision: {response}")),
    }
}
