//! Per-page orchestration: optional inclusion filtering, cache lookup, extraction on a
//! miss, cache update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use docsift_core::{InclusionDecision, PageResult, PipelineResult, ResultOrigin, RunStats};
use engine_logging::{engine_error, engine_info, engine_warn};
use futures_util::stream::{self, StreamExt};

use crate::cache::{ContentAddressedCache, ExtractionCacheEntry, MetadataCacheEntry};
use crate::classifier::InclusionClassifier;
use crate::extractor::{ExtractError, Extractor};
use crate::hash::hash_content;

/// Produces the timestamps stamped on extractions and cache entries.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Current UTC time, RFC 3339.
pub fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Clone)]
pub struct PipelineOptions {
    /// Pages in flight at once. Results keep crawl order regardless.
    pub concurrency: usize,
    /// Upper bound for one extraction call; expiry counts as an extraction failure.
    pub call_timeout: Option<Duration>,
    pub clock: Clock,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            call_timeout: None,
            clock: Arc::new(utc_now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutput {
    pub results: Vec<PipelineResult>,
    pub stats: RunStats,
}

enum PageOutcome {
    Excluded,
    Cached(PipelineResult),
    Fresh(PipelineResult),
    Failed(String),
}

struct PageFilter {
    classifier: InclusionClassifier,
    target_topic: String,
}

pub struct PipelineOrchestrator {
    cache: Mutex<ContentAddressedCache>,
    extractor: Arc<dyn Extractor>,
    filter: Option<PageFilter>,
    options: PipelineOptions,
}

impl PipelineOrchestrator {
    pub fn new(
        cache: ContentAddressedCache,
        extractor: Arc<dyn Extractor>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            cache: Mutex::new(cache),
            extractor,
            filter: None,
            options,
        }
    }

    /// Classify every page against `target_topic` before touching the cache.
    pub fn with_filter(
        mut self,
        classifier: InclusionClassifier,
        target_topic: impl Into<String>,
    ) -> Self {
        self.filter = Some(PageFilter {
            classifier,
            target_topic: target_topic.into(),
        });
        self
    }

    pub fn is_filtering(&self) -> bool {
        self.filter.is_some()
    }

    /// Release the cache, e.g. to inspect it after a run.
    pub fn into_cache(self) -> ContentAddressedCache {
        self.cache.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process `pages` and return the surviving results in crawl order.
    ///
    /// Never fails as a whole: classifier problems fail open and extraction problems
    /// drop only the affected page.
    pub async fn run(&self, pages: &[PageResult]) -> PipelineOutput {
        let total = pages.len();
        let concurrency = self.options.concurrency.max(1);
        engine_info!(
            "Processing {} page(s) with concurrency {} (filtering {})",
            total,
            concurrency,
            if self.is_filtering() { "on" } else { "off" }
        );

        let outcomes: Vec<PageOutcome> = stream::iter(pages.iter().enumerate())
            .map(|(idx, page)| self.process_page(idx, total, page))
            .buffered(concurrency)
            .collect()
            .await;

        let mut output = PipelineOutput {
            results: Vec::with_capacity(outcomes.len()),
            stats: RunStats {
                total_pages: total,
                ..RunStats::default()
            },
        };
        for outcome in outcomes {
            match outcome {
                PageOutcome::Excluded => output.stats.excluded += 1,
                PageOutcome::Cached(result) => {
                    output.stats.cache_hits += 1;
                    output.results.push(result);
                }
                PageOutcome::Fresh(result) => {
                    output.stats.freshly_processed += 1;
                    output.results.push(result);
                }
                PageOutcome::Failed(url) => {
                    output.stats.failed += 1;
                    output.stats.failed_urls.push(url);
                }
            }
        }
        output.stats.included = total - output.stats.excluded;

        engine_info!(
            "Run finished: {} page(s), {} excluded, {} cached, {} fresh, {} failed",
            total,
            output.stats.excluded,
            output.stats.cache_hits,
            output.stats.freshly_processed,
            output.stats.failed
        );
        output
    }

    async fn process_page(&self, idx: usize, total: usize, page: &PageResult) -> PageOutcome {
        engine_info!("Page {}/{}: {}", idx + 1, total, page.url);

        let decision = match &self.filter {
            Some(filter) => {
                let decision = filter
                    .classifier
                    .classify(
                        &page.url,
                        &page.title,
                        &page.cleaned_html,
                        &filter.target_topic,
                    )
                    .await;
                if !decision.included {
                    engine_info!("Excluded {}: {}", page.url, decision.explanation);
                    return PageOutcome::Excluded;
                }
                Some(decision)
            }
            None => None,
        };

        if let Some(result) = self.cached_result(page, decision.as_ref()) {
            return PageOutcome::Cached(result);
        }

        match self.extract(&page.cleaned_html).await {
            Ok(content) => PageOutcome::Fresh(self.store_fresh(page, content, decision)),
            Err(err) => {
                engine_error!("Extraction failed for {}: {}", page.url, err);
                PageOutcome::Failed(page.url.clone())
            }
        }
    }

    /// Cache hit path. `None` means the page must be extracted, either because the
    /// content is new/changed or because the cached entries could not be read.
    fn cached_result(
        &self,
        page: &PageResult,
        decision: Option<&InclusionDecision>,
    ) -> Option<PipelineResult> {
        let cache = self.lock_cache();
        let (needed, reason) = cache.should_process(&page.url, &page.cleaned_html);
        if needed {
            engine_info!("Extracting {} ({})", page.url, reason);
            return None;
        }

        let extraction = cache.get_cached_extraction(&page.url);
        let metadata = cache.get_cached_metadata(&page.url);
        let (Some(extraction), Some(metadata)) = (extraction, metadata) else {
            engine_warn!(
                "Cache entry for {} is unreadable; extracting again",
                page.url
            );
            return None;
        };

        let cache_timestamp = cache
            .record(&page.url)
            .map(|record| record.last_extracted.clone())
            .filter(|ts| !ts.is_empty())
            .unwrap_or(extraction.extraction_timestamp);
        engine_info!("Cache hit for {} (extracted {})", page.url, cache_timestamp);

        Some(PipelineResult {
            url: page.url.clone(),
            title: page.title.clone(),
            depth: page.depth,
            content: extraction.content,
            origin: ResultOrigin::Cached { cache_timestamp },
            decision: decision.cloned().or_else(|| metadata.decision()),
        })
    }

    async fn extract(&self, html: &str) -> Result<Vec<String>, ExtractError> {
        let call = self.extractor.extract(html);
        match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ExtractError::Timeout)?,
            None => call.await,
        }
    }

    fn store_fresh(
        &self,
        page: &PageResult,
        content: Vec<String>,
        decision: Option<InclusionDecision>,
    ) -> PipelineResult {
        let timestamp = (self.options.clock)();
        let extraction = ExtractionCacheEntry {
            url: page.url.clone(),
            content,
            extraction_timestamp: timestamp.clone(),
        };
        let metadata = MetadataCacheEntry {
            url: page.url.clone(),
            title: page.title.clone(),
            depth: page.depth,
            crawl_timestamp: timestamp.clone(),
            included: decision.as_ref().map(|d| d.included),
            decision_explanation: decision.as_ref().map(|d| d.explanation.clone()),
        };

        let content_hash = hash_content(&page.cleaned_html);
        let stored = self
            .lock_cache()
            .update(&page.url, &content_hash, &extraction, &metadata);
        if let Err(err) = stored {
            engine_error!("Could not cache extraction for {}: {}", page.url, err);
        }

        PipelineResult {
            url: page.url.clone(),
            title: page.title.clone(),
            depth: page.depth,
            content: extraction.content,
            origin: ResultOrigin::Fresh {
                extraction_timestamp: timestamp,
            },
            decision,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, ContentAddressedCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
