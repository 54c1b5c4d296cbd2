//! Command-line surface of the `docsift` binary.
//!
//! Every flag that has an environment variable falls back to it, so the precedence is
//! defaults, then `.env`, then the process environment, then the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docsift_core::{
    ConfigError, CrawlSettings, FilterPolicy, FilterSettings, LlmSettings,
    DEFAULT_EXTRACTION_INSTRUCTION,
};
use engine_logging::LogDestination;
use log::LevelFilter;

/// Used when `--timeout-secs` is not given.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Parser)]
#[command(name = "docsift")]
#[command(about = "Crawl documentation sites and extract their content with an LLM")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal, global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl, filter, extract (with cache) and write results
    Run {
        /// Start URL
        url: String,
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Directory for page_<n>.md, metadata and index.json
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        #[arg(long, env = "DOCSIFT_CACHE_DIR", default_value = "extracted-docs")]
        cache_dir: PathBuf,
        /// Pages processed at once; results keep crawl order
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },

    /// Crawl (and optionally filter) without extraction
    Crawl {
        /// Start URL
        url: String,
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        llm: LlmArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Extract a single local HTML file and print the blocks
    Parse {
        file: PathBuf,
        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Inspect or clean the extraction cache
    Cache {
        #[arg(long, env = "DOCSIFT_CACHE_DIR", default_value = "extracted-docs", global = true)]
        cache_dir: PathBuf,
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print cache statistics
    Stats,
    /// Remove records whose files are both gone
    Cleanup,
}

#[derive(Debug, Clone, Args)]
pub struct CrawlArgs {
    #[arg(long, env = "MAX_DEPTH", default_value_t = 2)]
    pub max_depth: u32,
    #[arg(long, env = "MAX_PAGES", default_value_t = 25)]
    pub max_pages: usize,
    /// Follow links to other hosts
    #[arg(long, env = "INCLUDE_EXTERNAL")]
    pub include_external: bool,
    /// Comma-separated keywords that steer the crawl
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,
    #[arg(long, default_value_t = 0.7)]
    pub keyword_weight: f32,
}

impl CrawlArgs {
    pub fn settings(&self) -> CrawlSettings {
        CrawlSettings {
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            include_external: self.include_external,
            keywords: self
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            keyword_weight: self.keyword_weight,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LlmArgs {
    /// Extraction model as vendor/model
    #[arg(long, env = "LLM_PROVIDER", default_value = "openai/gpt-4o")]
    pub provider: String,
    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.1)]
    pub temperature: f32,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,
    /// Replaces the built-in extraction instruction
    #[arg(long)]
    pub instruction: Option<String>,
    #[arg(long, default_value_t = 2048)]
    pub chunk_token_threshold: usize,
    /// Classifier model as vendor/model
    #[arg(long, env = "FILTER_LLM_PROVIDER", default_value = "openai/gpt-4o-mini")]
    pub filter_provider: String,
    #[arg(long, env = "FILTER_LLM_TEMPERATURE", default_value_t = 0.0)]
    pub filter_temperature: f32,
    /// Per-call timeout for model requests
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl LlmArgs {
    pub fn extraction_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.provider.clone(),
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            instruction: self
                .instruction
                .clone()
                .unwrap_or_else(|| DEFAULT_EXTRACTION_INSTRUCTION.to_string()),
            chunk_token_threshold: self.chunk_token_threshold,
        }
    }

    pub fn filter_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.filter_provider.clone(),
            temperature: self.filter_temperature,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            ..LlmSettings::filter_default()
        }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        self.call_timeout().unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Classify pages against --target-topic before extraction
    #[arg(long)]
    pub enable_filtering: bool,
    #[arg(long, env = "TARGET_TOPIC")]
    pub target_topic: Option<String>,
    /// Keep pages scoring at least this relevance instead of a binary verdict
    #[arg(long)]
    pub relevance_threshold: Option<f32>,
}

impl FilterArgs {
    pub fn settings(&self) -> FilterSettings {
        FilterSettings {
            enabled: self.enable_filtering,
            target_topic: self.target_topic.clone(),
            policy: self
                .relevance_threshold
                .map(FilterPolicy::Threshold)
                .unwrap_or_default(),
        }
    }
}

/// Validated settings for commands that crawl.
#[derive(Debug, Clone)]
pub struct CrawlPlan {
    pub crawl: CrawlSettings,
    pub extraction: LlmSettings,
    pub filter_llm: LlmSettings,
    pub filter: FilterSettings,
}

impl CrawlPlan {
    pub fn build(crawl: &CrawlArgs, llm: &LlmArgs, filter: &FilterArgs) -> Result<Self, ConfigError> {
        let plan = Self {
            crawl: crawl.settings(),
            extraction: llm.extraction_settings(),
            filter_llm: llm.filter_settings(),
            filter: filter.settings(),
        };
        plan.filter.validate()?;
        plan.crawl.validate()?;
        plan.extraction.validate("extraction")?;
        if plan.filter.enabled {
            plan.filter_llm.validate("filter")?;
        }
        Ok(plan)
    }
}
