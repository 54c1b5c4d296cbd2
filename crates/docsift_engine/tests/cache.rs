use std::fs;

use docsift_engine::{
    hash_content, url_hash, ContentAddressedCache, ExtractionCacheEntry, MetadataCacheEntry,
    ProcessReason, INDEX_FILE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn extraction(url: &str, content: &[&str], ts: &str) -> ExtractionCacheEntry {
    ExtractionCacheEntry {
        url: url.to_string(),
        content: content.iter().map(|s| s.to_string()).collect(),
        extraction_timestamp: ts.to_string(),
    }
}

fn metadata(url: &str, ts: &str) -> MetadataCacheEntry {
    MetadataCacheEntry {
        url: url.to_string(),
        title: "Page".to_string(),
        depth: 1,
        crawl_timestamp: ts.to_string(),
        included: None,
        decision_explanation: None,
    }
}

fn store(cache: &mut ContentAddressedCache, url: &str, html: &str, blocks: &[&str], ts: &str) {
    cache
        .update(url, &hash_content(html), &extraction(url, blocks, ts), &metadata(url, ts))
        .unwrap();
}

#[test]
fn unseen_changed_and_unchanged_content() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/a";

    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    assert_eq!(cache.should_process(url, "X"), (true, ProcessReason::New));
    store(&mut cache, url, "X", &["first"], "t1");

    let record = cache.record(url).unwrap().clone();
    assert_eq!(record.content_hash, hash_content("X"));
    assert_eq!(record.url_hash, url_hash(url));
    assert_eq!(record.last_extracted, "t1");

    // A fresh handle sees the persisted index.
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    assert_eq!(cache.should_process(url, "X"), (false, ProcessReason::Unchanged));
    assert_eq!(cache.should_process(url, "Y"), (true, ProcessReason::Changed));

    store(&mut cache, url, "Y", &["second"], "t2");
    let updated = cache.record(url).unwrap();
    assert_eq!(updated.content_hash, hash_content("Y"));
    assert_eq!(updated.extraction_file, record.extraction_file);
    assert_eq!(
        cache.get_cached_extraction(url).unwrap().content,
        vec!["second".to_string()]
    );
    assert_eq!(cache.len(), 1);
}

#[test]
fn should_process_does_not_mutate() {
    let temp = TempDir::new().unwrap();
    let cache = ContentAddressedCache::open(temp.path()).unwrap();
    let _ = cache.should_process("https://docs.example.com/a", "X");
    assert!(cache.is_empty());
    assert!(!temp.path().join(INDEX_FILE).exists());
}

#[test]
fn corrupt_index_starts_empty() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(INDEX_FILE), "{ not json").unwrap();

    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    assert!(cache.is_empty());

    store(&mut cache, "https://docs.example.com/a", "X", &["x"], "t1");
    let reopened = ContentAddressedCache::open(temp.path()).unwrap();
    assert_eq!(reopened.len(), 1);
}

#[test]
fn missing_entry_files_read_as_absent() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/a";
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    store(&mut cache, url, "X", &["x"], "t1");

    let record = cache.record(url).unwrap().clone();
    fs::remove_file(temp.path().join(&record.extraction_file)).unwrap();
    fs::write(temp.path().join(&record.metadata_file), "garbage").unwrap();

    assert!(cache.get_cached_extraction(url).is_none());
    assert!(cache.get_cached_metadata(url).is_none());
    assert!(cache.get_cached_extraction("https://docs.example.com/unknown").is_none());
}

#[test]
fn cleanup_only_removes_records_with_both_files_gone() {
    let temp = TempDir::new().unwrap();
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    let both_gone = "https://docs.example.com/gone";
    let half_gone = "https://docs.example.com/half";
    let intact = "https://docs.example.com/intact";
    for url in [both_gone, half_gone, intact] {
        store(&mut cache, url, url, &["x"], "t1");
    }

    let gone = cache.record(both_gone).unwrap().clone();
    fs::remove_file(temp.path().join(&gone.extraction_file)).unwrap();
    fs::remove_file(temp.path().join(&gone.metadata_file)).unwrap();
    let half = cache.record(half_gone).unwrap().clone();
    fs::remove_file(temp.path().join(&half.extraction_file)).unwrap();

    assert_eq!(cache.cleanup_stale().unwrap(), 1);
    assert!(cache.record(both_gone).is_none());
    assert!(cache.record(half_gone).is_some());
    assert!(cache.record(intact).is_some());
    assert_eq!(cache.cleanup_stale().unwrap(), 0);

    let reopened = ContentAddressedCache::open(temp.path()).unwrap();
    assert_eq!(reopened.len(), 2);
}

/// Turn the index path into a directory so the next index save fails.
fn block_index_writes(dir: &TempDir) {
    let index = dir.path().join(INDEX_FILE);
    if index.is_file() {
        fs::remove_file(&index).unwrap();
    }
    fs::create_dir(&index).unwrap();
}

#[test]
fn failed_index_save_never_serves_new_content_under_old_hash() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/a";
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    store(&mut cache, url, "X", &["extracted from X"], "t1");
    let record = cache.record(url).unwrap().clone();

    block_index_writes(&temp);
    let result = cache.update(
        url,
        &hash_content("Y"),
        &extraction(url, &["extracted from Y"], "t2"),
        &metadata(url, "t2"),
    );
    assert!(result.is_err());

    assert_eq!(cache.record(url), Some(&record));
    assert_eq!(cache.should_process(url, "X"), (false, ProcessReason::Unchanged));
    assert!(cache.get_cached_extraction(url).is_none());
    assert!(cache.get_cached_metadata(url).is_none());
    assert!(!temp.path().join(&record.extraction_file).exists());
    assert!(!temp.path().join(&record.metadata_file).exists());
}

#[test]
fn failed_index_save_for_new_url_leaves_no_trace() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/new";
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();

    block_index_writes(&temp);
    let result = cache.update(
        url,
        &hash_content("X"),
        &extraction(url, &["x"], "t1"),
        &metadata(url, "t1"),
    );
    assert!(result.is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.should_process(url, "X"), (true, ProcessReason::New));

    let hash = url_hash(url);
    assert!(!temp.path().join(format!("extractions/{hash}.json")).exists());
    assert!(!temp.path().join(format!("metadata/{hash}_meta.json")).exists());
}

#[test]
fn failed_cleanup_save_keeps_records_in_memory() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/gone";
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    store(&mut cache, url, "X", &["x"], "t1");
    let record = cache.record(url).unwrap().clone();
    fs::remove_file(temp.path().join(&record.extraction_file)).unwrap();
    fs::remove_file(temp.path().join(&record.metadata_file)).unwrap();

    block_index_writes(&temp);
    assert!(cache.cleanup_stale().is_err());
    assert_eq!(cache.record(url), Some(&record));
    assert_eq!(cache.len(), 1);
}

#[test]
fn stats_count_present_files() {
    let temp = TempDir::new().unwrap();
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    let stats = cache.stats();
    assert_eq!(stats.total_urls, 0);
    assert!(!stats.index_exists);

    store(&mut cache, "https://docs.example.com/a", "A", &["a"], "t1");
    store(&mut cache, "https://docs.example.com/b", "B", &["b"], "t1");
    let record = cache.record("https://docs.example.com/b").unwrap().clone();
    fs::remove_file(temp.path().join(&record.metadata_file)).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.total_urls, 2);
    assert_eq!(stats.extraction_files_present, 2);
    assert_eq!(stats.metadata_files_present, 1);
    assert!(stats.index_exists);
    assert_eq!(stats.base_dir, temp.path());
}

#[test]
fn decision_round_trips_through_metadata() {
    let temp = TempDir::new().unwrap();
    let url = "https://docs.example.com/a";
    let mut cache = ContentAddressedCache::open(temp.path()).unwrap();
    let mut meta = metadata(url, "t1");
    meta.included = Some(true);
    meta.decision_explanation = Some("About the API".to_string());
    cache
        .update(url, &hash_content("X"), &extraction(url, &["x"], "t1"), &meta)
        .unwrap();

    let decision = cache.get_cached_metadata(url).unwrap().decision().unwrap();
    assert!(decision.included);
    assert_eq!(decision.explanation, "About the API");
}
