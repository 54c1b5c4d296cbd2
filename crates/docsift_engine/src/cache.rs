//! Content-addressed extraction cache.
//!
//! Layout under the base directory:
//! - `content_index.json`: URL -> [`CacheRecord`], rewritten whole after every mutation
//! - `extractions/<url_hash>.json`: one [`ExtractionCacheEntry`] per URL
//! - `metadata/<url_hash>_meta.json`: one [`MetadataCacheEntry`] per URL
//!
//! The URL string is the identity key; `url_hash` only names files. Concurrent processes
//! sharing one base directory are not coordinated; callers must not do that.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docsift_core::InclusionDecision;
use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::{hash_content, url_hash};
use crate::persist::{ensure_dir, read_json, AtomicFileWriter, PersistError};

pub const INDEX_FILE: &str = "content_index.json";
pub const EXTRACTIONS_DIR: &str = "extractions";
pub const METADATA_DIR: &str = "metadata";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Persist(#[from] PersistError),
}

/// Index entry for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub last_extracted: String,
    /// Path of the extraction entry, relative to the cache base directory.
    #[serde(default)]
    pub extraction_file: String,
    /// Path of the metadata entry, relative to the cache base directory.
    #[serde(default)]
    pub metadata_file: String,
    #[serde(default)]
    pub url_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionCacheEntry {
    pub url: String,
    pub content: Vec<String>,
    pub extraction_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCacheEntry {
    pub url: String,
    pub title: String,
    pub depth: u32,
    pub crawl_timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_explanation: Option<String>,
}

impl MetadataCacheEntry {
    /// The inclusion decision stored with this entry, if one was recorded.
    pub fn decision(&self) -> Option<InclusionDecision> {
        self.included.map(|included| InclusionDecision {
            included,
            explanation: self.decision_explanation.clone().unwrap_or_default(),
        })
    }
}

/// Why a page does or does not need extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessReason {
    /// No record for the URL.
    New,
    /// A record exists but its content hash differs.
    Changed,
    /// The stored hash matches the current content.
    Unchanged,
}

impl ProcessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessReason::New => "new",
            ProcessReason::Changed => "changed",
            ProcessReason::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for ProcessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_urls: usize,
    pub extraction_files_present: usize,
    pub metadata_files_present: usize,
    pub index_exists: bool,
    pub base_dir: PathBuf,
}

pub struct ContentAddressedCache {
    base_dir: PathBuf,
    writer: AtomicFileWriter,
    index: BTreeMap<String, CacheRecord>,
}

impl ContentAddressedCache {
    /// Open (or create) a cache rooted at `base_dir`.
    ///
    /// A missing or unreadable index starts the cache empty; only failing to create the
    /// storage directories is an error.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let base_dir = base_dir.into();
        ensure_dir(&base_dir.join(EXTRACTIONS_DIR))?;
        ensure_dir(&base_dir.join(METADATA_DIR))?;

        let index = load_index(&base_dir.join(INDEX_FILE));
        engine_info!(
            "Opened content cache at {:?} with {} url(s)",
            base_dir,
            index.len()
        );
        Ok(Self {
            writer: AtomicFileWriter::new(base_dir.clone()),
            base_dir,
            index,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn record(&self, url: &str) -> Option<&CacheRecord> {
        self.index.get(url)
    }

    /// Decide whether `url` needs extraction for `cleaned_html`. Never mutates.
    pub fn should_process(&self, url: &str, cleaned_html: &str) -> (bool, ProcessReason) {
        let Some(record) = self.index.get(url) else {
            return (true, ProcessReason::New);
        };
        if record.content_hash != hash_content(cleaned_html) {
            return (true, ProcessReason::Changed);
        }
        (false, ProcessReason::Unchanged)
    }

    pub fn get_cached_extraction(&self, url: &str) -> Option<ExtractionCacheEntry> {
        let record = self.index.get(url)?;
        self.read_entry(&record.extraction_file, "extraction")
    }

    pub fn get_cached_metadata(&self, url: &str) -> Option<MetadataCacheEntry> {
        let record = self.index.get(url)?;
        self.read_entry(&record.metadata_file, "metadata")
    }

    /// Write both entries for `url`, replace its record and persist the index.
    ///
    /// Entry files are written before the index. If any write fails the in-memory index
    /// is left untouched and the entry files for `url` are removed, so a surviving record
    /// reads as unreadable and the page is extracted again.
    pub fn update(
        &mut self,
        url: &str,
        content_hash: &str,
        extraction: &ExtractionCacheEntry,
        metadata: &MetadataCacheEntry,
    ) -> Result<CacheRecord, CacheError> {
        let url_hash = url_hash(url);
        let extraction_file = format!("{EXTRACTIONS_DIR}/{url_hash}.json");
        let metadata_file = format!("{METADATA_DIR}/{url_hash}_meta.json");

        let written = self
            .writer
            .write_json(&extraction_file, extraction)
            .and_then(|_| self.writer.write_json(&metadata_file, metadata));
        if let Err(err) = written {
            self.discard_entries(&[extraction_file.as_str(), metadata_file.as_str()]);
            return Err(err.into());
        }

        let record = CacheRecord {
            content_hash: content_hash.to_string(),
            last_extracted: extraction.extraction_timestamp.clone(),
            extraction_file,
            metadata_file,
            url_hash,
        };
        let previous = self.index.insert(url.to_string(), record.clone());
        if let Err(err) = self.save_index() {
            // The new entry files must not be served under the previous record's hash.
            self.discard_entries(&[
                record.extraction_file.as_str(),
                record.metadata_file.as_str(),
            ]);
            match previous {
                Some(prev) => self.index.insert(url.to_string(), prev),
                None => self.index.remove(url),
            };
            return Err(err);
        }
        engine_debug!(
            "Cached extraction for {} (hash {})",
            url,
            &record.content_hash
        );
        Ok(record)
    }

    pub fn stats(&self) -> CacheStats {
        let mut extraction_files_present = 0;
        let mut metadata_files_present = 0;
        for record in self.index.values() {
            if self.resolves(&record.extraction_file) {
                extraction_files_present += 1;
            }
            if self.resolves(&record.metadata_file) {
                metadata_files_present += 1;
            }
        }
        CacheStats {
            total_urls: self.index.len(),
            extraction_files_present,
            metadata_files_present,
            index_exists: self.base_dir.join(INDEX_FILE).is_file(),
            base_dir: self.base_dir.clone(),
        }
    }

    /// Drop records whose extraction and metadata files are both gone.
    ///
    /// A record with either file still present is kept. Returns the number removed.
    pub fn cleanup_stale(&mut self) -> Result<usize, CacheError> {
        let stale: Vec<String> = self
            .index
            .iter()
            .filter(|(_, record)| {
                !self.resolves(&record.extraction_file) && !self.resolves(&record.metadata_file)
            })
            .map(|(url, _)| url.clone())
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let removed: Vec<(String, CacheRecord)> = stale
            .iter()
            .filter_map(|url| self.index.remove_entry(url))
            .collect();
        if let Err(err) = self.save_index() {
            self.index.extend(removed);
            return Err(err);
        }
        engine_info!("Removed {} stale entries from content index", removed.len());
        Ok(removed.len())
    }

    fn save_index(&self) -> Result<(), CacheError> {
        self.writer.write_json(INDEX_FILE, &self.index)?;
        Ok(())
    }

    fn discard_entries(&self, relative: &[&str]) {
        for rel in relative {
            let path = self.base_dir.join(rel);
            match fs::remove_file(&path) {
                Ok(()) => engine_warn!("Discarded cache entry {:?}", path),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => engine_warn!("Could not discard cache entry {:?}: {}", path, err),
            }
        }
    }

    fn resolves(&self, relative: &str) -> bool {
        !relative.is_empty() && self.base_dir.join(relative).is_file()
    }

    fn read_entry<T: serde::de::DeserializeOwned>(
        &self,
        relative: &str,
        kind: &str,
    ) -> Option<T> {
        if relative.is_empty() {
            return None;
        }
        let path = self.base_dir.join(relative);
        if !path.is_file() {
            engine_warn!("Cached {} file not found: {:?}", kind, path);
            return None;
        }
        match read_json(&path) {
            Ok(entry) => Some(entry),
            Err(err) => {
                engine_warn!("Could not load cached {} {:?}: {}", kind, path, err);
                None
            }
        }
    }
}

fn load_index(path: &Path) -> BTreeMap<String, CacheRecord> {
    if !path.exists() {
        return BTreeMap::new();
    }
    match read_json(path) {
        Ok(index) => index,
        Err(err) => {
            engine_warn!(
                "Could not load content index {:?}: {}; starting with empty index",
                path,
                err
            );
            BTreeMap::new()
        }
    }
}
