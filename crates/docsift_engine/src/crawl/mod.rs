//! Default crawl collaborator: fetch, clean, follow links.
mod clean;
mod crawler;
mod fetch;
mod links;
mod types;

pub use clean::{clean_html, CleanedPage};
pub use crawler::{keyword_score, BestFirstCrawler, PageSource};
pub use fetch::{decode_body, FetchSettings, Fetcher, ReqwestFetcher};
pub use links::{discover_links, discover_links_default};
pub use types::{CrawlError, FailureKind, FetchError, FetchedPage};
