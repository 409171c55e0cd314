//! Tests for export discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fieldsync_ingest::{IngestError, find_most_recent};
use tempfile::TempDir;

fn touch(dir: &Path, name: &str, modified: SystemTime) -> PathBuf {
    let path = dir.join(name);
    let file = fs::File::create(&path).expect("create file");
    file.set_modified(modified).expect("set mtime");
    path
}

#[test]
fn selects_newest_prefix_match() {
    let dir = TempDir::new().expect("temp dir");
    let t1 = SystemTime::now() - Duration::from_secs(7200);
    let t2 = t1 + Duration::from_secs(3600);
    touch(dir.path(), "backlog_2024.csv", t1);
    touch(dir.path(), "backlog_2025.csv", t2);
    touch(dir.path(), "other_2026.csv", t2 + Duration::from_secs(60));

    let export = find_most_recent(dir.path(), "backlog").expect("export found");

    assert_eq!(
        export.path.file_name().and_then(|n| n.to_str()),
        Some("backlog_2025.csv")
    );
    assert_eq!(export.modified, t2);
}

#[test]
fn empty_directory_is_not_found() {
    let dir = TempDir::new().expect("temp dir");

    let result = find_most_recent(dir.path(), "backlog");

    assert!(matches!(
        result,
        Err(IngestError::NotFound { ref prefix, .. }) if prefix == "backlog"
    ));
}
