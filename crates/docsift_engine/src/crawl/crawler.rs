use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use docsift_core::{CrawlSettings, PageResult};
use engine_logging::{engine_debug, engine_info, engine_warn};
use url::Url;

use super::clean::clean_html;
use super::fetch::Fetcher;
use super::links::discover_links_default;
use super::types::CrawlError;

/// Anything that can turn a start URL into crawled pages.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn crawl(&self, start_url: &str) -> Result<Vec<PageResult>, CrawlError>;
}

/// Share of `keywords` found in `url` (case-insensitive), times `weight`.
pub fn keyword_score(url: &str, keywords: &[String], weight: f32) -> f32 {
    let active: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if active.is_empty() {
        return 0.0;
    }
    let url = url.to_lowercase();
    let hits = active.iter().filter(|k| url.contains(k.as_str())).count();
    hits as f32 / active.len() as f32 * weight
}

#[derive(Debug)]
struct FrontierEntry {
    url: Url,
    depth: u32,
    score: f32,
    seq: u64,
}

// Max-heap order: higher score first, then shallower, then earlier discovery.
impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.depth.cmp(&self.depth))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

/// Best-first crawl bounded by depth and page count.
pub struct BestFirstCrawler {
    settings: CrawlSettings,
    fetcher: Arc<dyn Fetcher>,
}

impl BestFirstCrawler {
    pub fn new(settings: CrawlSettings, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { settings, fetcher }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    fn in_scope(&self, url: &Url, start_host: Option<&str>) -> bool {
        self.settings.include_external || url.host_str() == start_host
    }

    fn score(&self, url: &Url) -> f32 {
        keyword_score(
            url.as_str(),
            &self.settings.keywords,
            self.settings.keyword_weight,
        )
    }
}

#[async_trait::async_trait]
impl PageSource for BestFirstCrawler {
    async fn crawl(&self, start_url: &str) -> Result<Vec<PageResult>, CrawlError> {
        let mut start = Url::parse(start_url).map_err(|err| CrawlError::InvalidStartUrl {
            url: start_url.to_string(),
            message: err.to_string(),
        })?;
        start.set_fragment(None);
        let start_host = start.host_str().map(str::to_string);

        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier = BinaryHeap::new();
        let mut seq = 0u64;
        seen.insert(start.as_str().to_string());
        frontier.push(FrontierEntry {
            score: self.score(&start),
            url: start,
            depth: 0,
            seq,
        });

        let mut pages = Vec::new();
        while let Some(entry) = frontier.pop() {
            if pages.len() >= self.settings.max_pages {
                break;
            }

            let fetched = match self.fetcher.fetch(entry.url.as_str()).await {
                Ok(fetched) => fetched,
                Err(err) if entry.depth == 0 && pages.is_empty() => {
                    return Err(CrawlError::StartPage(err));
                }
                Err(err) => {
                    engine_warn!("Skipping {}: {}", entry.url, err);
                    continue;
                }
            };

            let cleaned = clean_html(&fetched.html);
            engine_info!(
                "Crawled {} (depth {}, score {:.2})",
                entry.url,
                entry.depth,
                entry.score
            );

            if entry.depth < self.settings.max_depth {
                let base = Url::parse(&fetched.final_url).unwrap_or_else(|_| entry.url.clone());
                seen.insert(base.as_str().to_string());
                for link in discover_links_default(&fetched.html, &base) {
                    if !self.in_scope(&link, start_host.as_deref()) {
                        continue;
                    }
                    if !seen.insert(link.as_str().to_string()) {
                        continue;
                    }
                    seq += 1;
                    engine_debug!("Queued {} at depth {}", link, entry.depth + 1);
                    frontier.push(FrontierEntry {
                        score: self.score(&link),
                        url: link,
                        depth: entry.depth + 1,
                        seq,
                    });
                }
            }

            pages.push(PageResult::new(
                entry.url.as_str(),
                fetched.html,
                cleaned.cleaned_html,
                entry.depth,
                cleaned.title,
            ));
        }

        engine_info!("Crawl of {} produced {} page(s)", start_url, pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, depth: u32, score: f32, seq: u64) -> FrontierEntry {
        FrontierEntry {
            url: Url::parse(url).unwrap(),
            depth,
            score,
            seq,
        }
    }

    #[test]
    fn keyword_score_is_share_of_matches_times_weight() {
        let keywords = vec!["api".to_string(), "Reference".to_string()];
        assert_eq!(keyword_score("https://x.dev/api/reference", &keywords, 0.5), 0.5);
        assert_eq!(keyword_score("https://x.dev/api/", &keywords, 1.0), 0.5);
        assert_eq!(keyword_score("https://x.dev/blog", &keywords, 1.0), 0.0);
        assert_eq!(keyword_score("https://x.dev/api", &[], 1.0), 0.0);
    }

    #[test]
    fn frontier_prefers_score_then_depth_then_discovery() {
        let mut heap = BinaryHeap::new();
        heap.push(entry("https://x.dev/a", 1, 0.0, 1));
        heap.push(entry("https://x.dev/b", 2, 0.7, 2));
        heap.push(entry("https://x.dev/c", 1, 0.0, 3));
        heap.push(entry("https://x.dev/d", 2, 0.0, 0));

        let order: Vec<String> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/b", "/a", "/c", "/d"]);
    }
}
