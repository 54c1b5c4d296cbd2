//! Docsift core: pure page/result types, inclusion decisions and settings validation.
mod config;
mod decision;
mod page;
mod policy;
mod result;

pub use config::{
    ConfigError, CrawlSettings, FilterSettings, LlmSettings, DEFAULT_EXTRACTION_INSTRUCTION,
};
pub use decision::{
    build_inclusion_prompt, content_sample, parse_inclusion_response, InclusionDecision,
    CONTENT_SAMPLE_CHARS, INCLUSION_SYSTEM_PROMPT,
};
pub use page::PageResult;
pub use policy::{build_relevance_prompt, parse_relevance_response, FilterPolicy};
pub use result::{PipelineResult, ResultOrigin, RunStats};
