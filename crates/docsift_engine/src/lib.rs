//! Docsift engine: cache, model calls, crawling and all other IO.
mod cache;
mod classifier;
mod crawl;
mod extractor;
mod hash;
mod llm;
mod persist;
mod pipeline;
mod token;
mod writer;

pub use cache::{
    CacheError, CacheRecord, CacheStats, ContentAddressedCache, ExtractionCacheEntry,
    MetadataCacheEntry, ProcessReason, EXTRACTIONS_DIR, INDEX_FILE, METADATA_DIR,
};
pub use classifier::InclusionClassifier;
pub use crawl::{
    clean_html, decode_body, discover_links, discover_links_default, keyword_score,
    BestFirstCrawler, CleanedPage, CrawlError, FailureKind, FetchError, FetchSettings,
    FetchedPage, Fetcher, PageSource, ReqwestFetcher,
};
pub use extractor::{ExtractError, Extractor, LlmExtractor};
pub use hash::{hash_content, url_hash, URL_HASH_LEN};
pub use llm::{ChatClient, LlmError, TextGenerator};
pub use persist::{ensure_dir, read_json, AtomicFileWriter, PersistError};
pub use pipeline::{utc_now, Clock, PipelineOptions, PipelineOrchestrator, PipelineOutput};
pub use token::{chunk_by_tokens, TokenCounter, WhitespaceTokenCounter};
pub use writer::{ResultWriter, WriteError, WriteSummary, INDEX_FILENAME};
