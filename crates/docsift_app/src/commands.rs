use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use docsift_core::{InclusionDecision, LlmSettings, PageResult, RunStats};
use docsift_engine::{
    clean_html, utc_now, BestFirstCrawler, ChatClient, ContentAddressedCache, Extractor,
    FetchSettings, InclusionClassifier, LlmExtractor, PageSource, PipelineOptions,
    PipelineOrchestrator, ResultWriter, ReqwestFetcher, TextGenerator,
};
use engine_logging::{engine_error, engine_info};

use crate::cli::{CacheCommand, CrawlArgs, CrawlPlan, FilterArgs, LlmArgs};

/// Classifier responses are short JSON objects.
const CLASSIFIER_MAX_TOKENS: u32 = 500;

pub struct RunRequest<'a> {
    pub url: &'a str,
    pub crawl: &'a CrawlArgs,
    pub llm: &'a LlmArgs,
    pub filter: &'a FilterArgs,
    pub output_dir: &'a Path,
    pub cache_dir: &'a Path,
    pub concurrency: usize,
}

pub async fn run(request: RunRequest<'_>) -> Result<()> {
    let plan = CrawlPlan::build(request.crawl, request.llm, request.filter)?;
    let extraction = generator(&plan.extraction, request.llm, None)?;
    let classifier = classifier(&plan, request.llm)?;
    let cache = ContentAddressedCache::open(request.cache_dir)
        .with_context(|| format!("opening cache at {}", request.cache_dir.display()))?;

    let pages = crawl_pages(&plan, request.url).await;

    let extractor = LlmExtractor::new(
        extraction,
        plan.extraction.instruction.clone(),
        plan.extraction.chunk_token_threshold,
    );
    let options = PipelineOptions {
        concurrency: request.concurrency.max(1),
        call_timeout: request.llm.call_timeout(),
        clock: Arc::new(utc_now),
    };
    let mut orchestrator = PipelineOrchestrator::new(cache, Arc::new(extractor), options);
    if let (Some(classifier), Some(topic)) = (classifier, plan.filter.active_topic()) {
        orchestrator = orchestrator.with_filter(classifier, topic);
    }

    let output = orchestrator.run(&pages).await;
    let summary = ResultWriter::new(request.output_dir)
        .write_results(&output.results)
        .context("writing results")?;

    print_summary(&output.stats);
    println!(
        "Wrote {} document(s) to {}",
        summary.documents_written,
        request.output_dir.display()
    );
    Ok(())
}

pub async fn crawl(
    url: &str,
    crawl: &CrawlArgs,
    llm: &LlmArgs,
    filter: &FilterArgs,
    output_dir: &Path,
) -> Result<()> {
    let plan = CrawlPlan::build(crawl, llm, filter)?;
    let classifier = classifier(&plan, llm)?;
    let pages = crawl_pages(&plan, url).await;

    let mut listed: Vec<(PageResult, Option<InclusionDecision>)> = Vec::with_capacity(pages.len());
    for page in pages {
        let decision = match (&classifier, plan.filter.active_topic()) {
            (Some(classifier), Some(topic)) => Some(
                classifier
                    .classify(&page.url, &page.title, &page.cleaned_html, topic)
                    .await,
            ),
            _ => None,
        };
        listed.push((page, decision));
    }

    let index = ResultWriter::new(output_dir)
        .write_crawl_index(&listed)
        .context("writing crawl index")?;
    let included = listed
        .iter()
        .filter(|(_, decision)| decision.as_ref().is_none_or(|d| d.included))
        .count();
    println!(
        "Crawled {} page(s), {} included; index written to {}",
        listed.len(),
        included,
        index.display()
    );
    Ok(())
}

pub async fn parse(file: &Path, llm: &LlmArgs) -> Result<()> {
    let settings = llm.extraction_settings();
    settings.validate("extraction")?;
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let cleaned = clean_html(&html);

    let extractor = LlmExtractor::new(
        generator(&settings, llm, None)?,
        settings.instruction.clone(),
        settings.chunk_token_threshold,
    );
    let blocks = extractor
        .extract(&cleaned.cleaned_html)
        .await
        .with_context(|| format!("extracting {}", file.display()))?;
    engine_info!("Extracted {} block(s) from {:?}", blocks.len(), file);
    println!("{}", blocks.join("\n\n"));
    Ok(())
}

pub fn cache(cache_dir: &Path, command: &CacheCommand) -> Result<()> {
    let mut cache = ContentAddressedCache::open(cache_dir)
        .with_context(|| format!("opening cache at {}", cache_dir.display()))?;
    match command {
        CacheCommand::Stats => {
            let stats = cache.stats();
            println!("Cache directory:  {}", stats.base_dir.display());
            println!("Index present:    {}", stats.index_exists);
            println!("Cached URLs:      {}", stats.total_urls);
            println!("Extraction files: {}", stats.extraction_files_present);
            println!("Metadata files:   {}", stats.metadata_files_present);
        }
        CacheCommand::Cleanup => {
            let removed = cache.cleanup_stale().context("cleaning cache")?;
            println!("Removed {removed} stale record(s); {} remain", cache.len());
        }
    }
    Ok(())
}

async fn crawl_pages(plan: &CrawlPlan, url: &str) -> Vec<PageResult> {
    let fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::default()));
    let crawler = BestFirstCrawler::new(plan.crawl.clone(), fetcher);
    match crawler.crawl(url).await {
        Ok(pages) => pages,
        Err(err) => {
            engine_error!("Crawl of {} failed: {}", url, err);
            Vec::new()
        }
    }
}

fn generator(
    settings: &LlmSettings,
    llm: &LlmArgs,
    max_tokens: Option<u32>,
) -> Result<Arc<dyn TextGenerator>> {
    let mut client = ChatClient::new(settings.clone(), llm.request_timeout())?;
    if let Some(max_tokens) = max_tokens {
        client = client.with_max_tokens(max_tokens);
    }
    Ok(Arc::new(client))
}

fn classifier(plan: &CrawlPlan, llm: &LlmArgs) -> Result<Option<InclusionClassifier>> {
    if plan.filter.active_topic().is_none() {
        return Ok(None);
    }
    let generator = generator(&plan.filter_llm, llm, Some(CLASSIFIER_MAX_TOKENS))?;
    let mut classifier = InclusionClassifier::new(generator).with_policy(plan.filter.policy);
    if let Some(timeout) = llm.call_timeout() {
        classifier = classifier.with_timeout(timeout);
    }
    Ok(Some(classifier))
}

fn print_summary(stats: &RunStats) {
    println!("Pages crawled:     {}", stats.total_pages);
    println!("Included:          {}", stats.included);
    println!("Excluded:          {}", stats.excluded);
    println!("Served from cache: {}", stats.cache_hits);
    println!("Freshly extracted: {}", stats.freshly_processed);
    println!("Failed:            {}", stats.failed);
    if stats.produced() > 0 {
        println!("Cache hit rate:    {:.1}%", stats.hit_rate());
    }
    for url in &stats.failed_urls {
        println!("  failed: {url}");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use docsift_engine::{hash_content, ExtractionCacheEntry, MetadataCacheEntry};
    use tempfile::TempDir;

    use super::*;

    fn seed(dir: &Path, url: &str) -> docsift_engine::CacheRecord {
        let mut store = ContentAddressedCache::open(dir).unwrap();
        store
            .update(
                url,
                &hash_content("X"),
                &ExtractionCacheEntry {
                    url: url.to_string(),
                    content: vec!["x".to_string()],
                    extraction_timestamp: "t1".to_string(),
                },
                &MetadataCacheEntry {
                    url: url.to_string(),
                    title: "Page".to_string(),
                    depth: 0,
                    crawl_timestamp: "t1".to_string(),
                    included: None,
                    decision_explanation: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn cache_stats_work_on_a_fresh_directory() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("extracted-docs");
        cache(&base, &CacheCommand::Stats).unwrap();
        assert!(base.join("extractions").is_dir());
        assert!(base.join("metadata").is_dir());
    }

    #[test]
    fn cache_cleanup_drops_records_without_files() {
        let dir = TempDir::new().unwrap();
        let gone = seed(dir.path(), "https://docs.example.com/gone");
        seed(dir.path(), "https://docs.example.com/kept");
        fs::remove_file(dir.path().join(&gone.extraction_file)).unwrap();
        fs::remove_file(dir.path().join(&gone.metadata_file)).unwrap();

        cache(dir.path(), &CacheCommand::Cleanup).unwrap();

        let reopened = ContentAddressedCache::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.record("https://docs.example.com/kept").is_some());
    }
}
