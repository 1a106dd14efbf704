//! End-to-end pipeline properties: incremental runs against a growing log
//! must be indistinguishable from one cold pass over the whole file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tally::{digest, CacheState, DigestError, TallyConfig, TruncationPolicy};

const BATCH_ONE: &str = "\
[01-Jan-2024 00:00:00 UTC] PHP Fatal error: Foo in /a.php on line 5
[01-Jan-2024 00:00:01 UTC] PHP Fatal error: Bar in /a.php on line 9 Stack trace:
#0 /a.php(9): bar()
#1 {main}
";

const BATCH_TWO: &str = "\
[01-Jan-2024 00:00:02 UTC] PHP Notice: Baz in /a.php on line 1
[01-Jan-2024 00:00:03 UTC] PHP Fatal error: Foo in /a.php on line 5
";

fn config(log_path: &Path, cache_path: Option<PathBuf>) -> TallyConfig {
    TallyConfig {
        log_path: log_path.to_path_buf(),
        cache_path,
        ..TallyConfig::default()
    }
}

fn append(path: &Path, content: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

#[test]
fn split_runs_match_one_cold_pass() {
    let dir = TempDir::new().unwrap();

    // One cold pass over the full input.
    let full_log = dir.path().join("full.log");
    fs::write(&full_log, format!("{BATCH_ONE}{BATCH_TWO}")).unwrap();
    let cold = digest::run(&config(&full_log, None)).unwrap();

    // Two cached runs split at a line boundary.
    let grown_log = dir.path().join("grown.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&grown_log, BATCH_ONE).unwrap();
    digest::run(&config(&grown_log, Some(cache.clone()))).unwrap();
    append(&grown_log, BATCH_TWO);
    let warm = digest::run(&config(&grown_log, Some(cache))).unwrap();

    assert_eq!(cold.records.len(), warm.records.len());
    for (key, record) in &cold.records {
        let other = &warm.records[key];
        assert_eq!(record.hits, other.hits, "hits diverge for {key}");
        assert_eq!(record.first_seen, other.first_seen);
        assert_eq!(record.last_seen, other.last_seen);
    }
    assert_eq!(cold.type_counts, warm.type_counts);
    assert_eq!(cold.type_registry, warm.type_registry);
}

#[test]
fn saved_offset_tracks_file_size_monotonically() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, BATCH_ONE).unwrap();

    let first = digest::run(&config(&log, Some(cache.clone()))).unwrap();
    assert_eq!(first.offset, fs::metadata(&log).unwrap().len());

    append(&log, BATCH_TWO);
    let second = digest::run(&config(&log, Some(cache))).unwrap();
    assert_eq!(second.offset, fs::metadata(&log).unwrap().len());
    assert!(second.offset >= first.offset);
}

#[test]
fn rerun_without_growth_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, BATCH_ONE).unwrap();

    let first = digest::run(&config(&log, Some(cache.clone()))).unwrap();
    let second = digest::run(&config(&log, Some(cache))).unwrap();
    assert_eq!(first, second);
}

#[test]
fn deferred_trace_lands_on_predecessor() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    fs::write(&log, format!("{BATCH_ONE}{BATCH_TWO}")).unwrap();

    let out = digest::run(&config(&log, None)).unwrap();
    assert_eq!(out.records.len(), 3);
    let foo = &out.records["Foo"];
    assert_eq!(foo.trace.as_deref(), Some("#0 /a.php(9): bar()\n#1 {main}"));
    assert_eq!(foo.hits, 2);
    assert_eq!(foo.error_type, "Fatal error");
    assert!(out.records["Bar"].trace.is_none());
}

#[test]
fn hit_counting_spans_timestamps() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    fs::write(
        &log,
        "[02-Jan-2024 08:00:00 UTC] PHP Notice: twice\n\
         [01-Jan-2024 07:00:00 UTC] PHP Notice: twice\n",
    )
    .unwrap();

    let out = digest::run(&config(&log, None)).unwrap();
    let record = &out.records["twice"];
    assert_eq!(record.hits, 2);
    assert!(record.first_seen.unwrap() < record.last_seen.unwrap());
}

#[test]
fn empty_log_is_a_clean_run() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, "").unwrap();

    let out = digest::run(&config(&log, Some(cache.clone()))).unwrap();
    assert!(out.records.is_empty());
    assert_eq!(out.offset, 0);
    assert!(cache.exists());
}

#[test]
fn missing_log_is_fatal() {
    let dir = TempDir::new().unwrap();
    let result = digest::run(&config(&dir.path().join("absent.log"), None));
    assert!(matches!(result, Err(DigestError::OpenLog { .. })));
}

#[test]
fn corrupt_cache_degrades_to_cold_start() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, BATCH_ONE).unwrap();
    fs::write(&cache, "definitely { not json").unwrap();

    let out = digest::run(&config(&log, Some(cache))).unwrap();
    assert_eq!(out.records.len(), 2);
}

#[test]
fn truncation_reset_rescans_from_zero() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, format!("{BATCH_ONE}{BATCH_TWO}")).unwrap();
    digest::run(&config(&log, Some(cache.clone()))).unwrap();

    // Rotation: the file is replaced by a shorter one.
    fs::write(&log, "[05-Jan-2024 00:00:00 UTC] PHP Notice: fresh\n").unwrap();
    let out = digest::run(&config(&log, Some(cache))).unwrap();
    assert_eq!(out.records.len(), 1);
    assert!(out.records.contains_key("fresh"));
}

#[test]
fn truncation_fail_policy_surfaces_error() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, format!("{BATCH_ONE}{BATCH_TWO}")).unwrap();
    digest::run(&config(&log, Some(cache.clone()))).unwrap();

    fs::write(&log, "short\n").unwrap();
    let mut cfg = config(&log, Some(cache));
    cfg.on_truncation = TruncationPolicy::Fail;
    assert!(matches!(
        digest::run(&cfg),
        Err(DigestError::Truncated { .. })
    ));
}

#[test]
fn excerpt_enrichment_reads_referenced_source() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("app.php");
    fs::write(&source, "<?php\nline two\nline three\nboom();\nline five\n").unwrap();

    let log = dir.path().join("php.log");
    fs::write(
        &log,
        format!(
            "[01-Jan-2024 00:00:00 UTC] PHP Fatal error: boom in {} on line 4\n",
            source.display()
        ),
    )
    .unwrap();

    let out = digest::run(&config(&log, None)).unwrap();
    let record = &out.records["boom"];
    let excerpt = record.excerpt.as_deref().unwrap();
    assert!(excerpt.contains("boom();"));
    assert!(excerpt.starts_with("<?php"));
}

#[test]
fn cache_file_round_trips_full_state() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("php.log");
    let cache = dir.path().join("tally.cache");
    fs::write(&log, format!("{BATCH_ONE}{BATCH_TWO}")).unwrap();

    let out = digest::run(&config(&log, Some(cache.clone()))).unwrap();
    let restored: CacheState =
        serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(out, restored);
}
