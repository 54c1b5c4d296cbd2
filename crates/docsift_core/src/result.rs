use crate::decision::InclusionDecision;

/// Where a result's content came from, with the matching timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOrigin {
    /// Reused from the content cache; timestamp of the extraction that produced it.
    Cached { cache_timestamp: String },
    /// Extracted during this run.
    Fresh { extraction_timestamp: String },
}

/// Final per-page output of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub url: String,
    pub title: String,
    pub depth: u32,
    pub content: Vec<String>,
    pub origin: ResultOrigin,
    pub decision: Option<InclusionDecision>,
}

impl PipelineResult {
    pub fn is_cached(&self) -> bool {
        matches!(self.origin, ResultOrigin::Cached { .. })
    }

    pub fn cache_timestamp(&self) -> Option<&str> {
        match &self.origin {
            ResultOrigin::Cached { cache_timestamp } => Some(cache_timestamp),
            ResultOrigin::Fresh { .. } => None,
        }
    }

    pub fn extraction_timestamp(&self) -> Option<&str> {
        match &self.origin {
            ResultOrigin::Fresh {
                extraction_timestamp,
            } => Some(extraction_timestamp),
            ResultOrigin::Cached { .. } => None,
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.iter().any(|block| !block.is_empty())
    }

    /// Content blocks joined the way they are written to disk.
    pub fn joined_content(&self) -> String {
        self.content.join("\n")
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Pages received from the crawl.
    pub total_pages: usize,
    /// Pages the classifier kept (equals `total_pages` when filtering is off).
    pub included: usize,
    /// Pages the classifier dropped.
    pub excluded: usize,
    pub cache_hits: usize,
    pub freshly_processed: usize,
    /// Pages dropped because extraction failed.
    pub failed: usize,
    pub failed_urls: Vec<String>,
}

impl RunStats {
    pub fn produced(&self) -> usize {
        self.cache_hits + self.freshly_processed
    }

    /// Share of produced results served from cache, in percent.
    pub fn hit_rate(&self) -> f64 {
        let produced = self.produced();
        if produced == 0 {
            0.0
        } else {
            self.cache_hits as f64 * 100.0 / produced as f64
        }
    }
}
