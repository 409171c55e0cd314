//! Export discovery in the downloads directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{IngestError, Result};

/// A file matching the export prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExport {
    /// Path to the export file.
    pub path: PathBuf,
    /// Last modification time, used to pick the newest export.
    pub modified: SystemTime,
}

/// Lists files in `dir` whose name starts with `prefix` (the `<prefix>*` glob).
///
/// Returns files sorted by filename.
pub fn list_exports(dir: &Path, prefix: &str) -> Result<Vec<RawExport>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut exports = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(prefix));
        if !matches {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .map_err(|e| IngestError::FileRead {
                path: path.clone(),
                source: e,
            })?;
        exports.push(RawExport { path, modified });
    }

    exports.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    Ok(exports)
}

/// Finds the most recently modified export in `dir`.
///
/// Absence is a hard failure ([`IngestError::NotFound`]), never an empty result.
pub fn find_most_recent(dir: &Path, prefix: &str) -> Result<RawExport> {
    let exports = list_exports(dir, prefix)?;
    let newest = exports.into_iter().max_by_key(|export| export.modified);
    match newest {
        Some(export) => Ok(export),
        None => {
            tracing::error!(dir = %dir.display(), prefix, "No export found");
            Err(IngestError::NotFound {
                dir: dir.to_path_buf(),
                prefix: prefix.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
        path
    }

    #[test]
    fn test_list_exports_filters_by_prefix() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "backlog_b.csv", 10);
        touch(dir.path(), "backlog_a.csv", 10);
        touch(dir.path(), "report.csv", 10);
        std::fs::create_dir(dir.path().join("backlog_dir")).unwrap();

        let exports = list_exports(dir.path(), "backlog").unwrap();
        let names: Vec<_> = exports
            .iter()
            .map(|e| e.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["backlog_a.csv", "backlog_b.csv"]);
    }

    #[test]
    fn test_find_most_recent_prefers_newest_mtime() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "backlog_2025.csv", 10);
        touch(dir.path(), "backlog_2024.csv", 3600);

        let newest = find_most_recent(dir.path(), "backlog").unwrap();
        assert!(newest.path.ends_with("backlog_2025.csv"));
    }

    #[test]
    fn test_find_most_recent_ignores_name_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "backlog_a.csv", 10);
        touch(dir.path(), "backlog_z.csv", 3600);

        let newest = find_most_recent(dir.path(), "backlog").unwrap();
        assert!(newest.path.ends_with("backlog_a.csv"));
    }

    #[test]
    fn test_missing_directory() {
        let result = find_most_recent(Path::new("/nonexistent/downloads"), "backlog");
        assert!(matches!(result, Err(IngestError::DirectoryNotFound { .. })));
    }
}
