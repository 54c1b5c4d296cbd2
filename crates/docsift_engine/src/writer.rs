use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docsift_core::{InclusionDecision, PageResult, PipelineResult};
use engine_logging::engine_info;
use serde::Serialize;
use thiserror::Error;

use crate::persist::{ensure_dir, AtomicFileWriter, PersistError};

pub const INDEX_FILENAME: &str = "index.json";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("could not write results: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub result_count: usize,
    /// Number of `page_<n>.md` files written (results with content).
    pub documents_written: usize,
    pub index_path: PathBuf,
}

/// Per-result metadata: every result field except the content.
#[derive(Debug, Serialize)]
struct ResultMeta<'a> {
    url: &'a str,
    title: &'a str,
    depth: u32,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_timestamp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extraction_timestamp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision_explanation: Option<&'a str>,
}

impl<'a> ResultMeta<'a> {
    fn from_result(result: &'a PipelineResult) -> Self {
        Self {
            url: &result.url,
            title: &result.title,
            depth: result.depth,
            cached: result.is_cached(),
            cache_timestamp: result.cache_timestamp(),
            extraction_timestamp: result.extraction_timestamp(),
            included: result.decision.as_ref().map(|d| d.included),
            decision_explanation: result.decision.as_ref().map(|d| d.explanation.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    url: &'a str,
    title: &'a str,
    depth: u32,
    filename: String,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_timestamp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extraction_timestamp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision_explanation: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CrawlIndexEntry<'a> {
    url: &'a str,
    title: &'a str,
    depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision_explanation: Option<&'a str>,
}

/// Writes run output: `page_<n>.md`, `page_<n>_meta.json` and `index.json`.
///
/// `n` is the 1-based position in the result list, so numbering is stable even when a
/// result without content gets no markdown file. Page files from an earlier run into the
/// same directory that the new results do not cover are removed.
pub struct ResultWriter {
    writer: AtomicFileWriter,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir.into()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn write_results(&self, results: &[PipelineResult]) -> Result<WriteSummary, WriteError> {
        ensure_dir(self.writer.dir())?;

        let mut index = Vec::with_capacity(results.len());
        let mut documents_written = 0;
        for (i, result) in results.iter().enumerate() {
            let base = format!("page_{}", i + 1);
            let filename = format!("{base}.md");

            if result.has_content() {
                self.writer.write(&filename, &result.joined_content())?;
                documents_written += 1;
            } else {
                remove_if_present(&self.writer.dir().join(&filename))?;
            }

            let meta = ResultMeta::from_result(result);
            self.writer.write_json(&format!("{base}_meta.json"), &meta)?;

            if result.has_content() {
                index.push(IndexEntry {
                    url: meta.url,
                    title: meta.title,
                    depth: meta.depth,
                    filename,
                    cached: meta.cached,
                    cache_timestamp: meta.cache_timestamp,
                    extraction_timestamp: meta.extraction_timestamp,
                    included: meta.included,
                    decision_explanation: meta.decision_explanation,
                });
            }
        }

        let index_path = self.writer.write_json(INDEX_FILENAME, &index)?;
        let removed = self.remove_pages_beyond(results.len())?;
        if removed > 0 {
            engine_info!("Removed {} page file(s) left from an earlier run", removed);
        }
        engine_info!(
            "Results saved to {:?} ({} document(s))",
            self.writer.dir(),
            documents_written
        );
        Ok(WriteSummary {
            result_count: results.len(),
            documents_written,
            index_path,
        })
    }

    /// Delete `page_<n>.md` / `page_<n>_meta.json` with `n > count`.
    fn remove_pages_beyond(&self, count: usize) -> Result<usize, WriteError> {
        let mut removed = 0;
        for entry in fs::read_dir(self.writer.dir()).map_err(PersistError::from)? {
            let path = entry.map_err(PersistError::from)?.path();
            let Some(n) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(page_number)
            else {
                continue;
            };
            if n > count && path.is_file() {
                fs::remove_file(&path).map_err(PersistError::from)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Crawl-only output: the page list (with decisions when filtering ran) as `index.json`.
    pub fn write_crawl_index(
        &self,
        pages: &[(PageResult, Option<InclusionDecision>)],
    ) -> Result<PathBuf, WriteError> {
        ensure_dir(self.writer.dir())?;
        let entries: Vec<CrawlIndexEntry<'_>> = pages
            .iter()
            .map(|(page, decision)| CrawlIndexEntry {
                url: &page.url,
                title: &page.title,
                depth: page.depth,
                included: decision.as_ref().map(|d| d.included),
                decision_explanation: decision.as_ref().map(|d| d.explanation.as_str()),
            })
            .collect();
        Ok(self.writer.write_json(INDEX_FILENAME, &entries)?)
    }
}

/// The `n` of a `page_<n>.md` or `page_<n>_meta.json` file name.
fn page_number(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("page_")?;
    let digits = rest
        .strip_suffix("_meta.json")
        .or_else(|| rest.strip_suffix(".md"))?;
    digits.parse().ok()
}

fn remove_if_present(path: &Path) -> Result<(), PersistError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::page_number;

    #[test]
    fn page_numbers_are_read_from_both_file_kinds() {
        assert_eq!(page_number("page_3.md"), Some(3));
        assert_eq!(page_number("page_12_meta.json"), Some(12));
        assert_eq!(page_number("page_x.md"), None);
        assert_eq!(page_number("index.json"), None);
        assert_eq!(page_number("page_2.txt"), None);
    }
}
