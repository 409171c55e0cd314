//! Discovery → loading → normalization for the backlog export.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;

use fieldsync_ingest::{ChunkedLoader, LoaderOptions, find_most_recent};
use fieldsync_normalization::{ColumnWarning, NormalizationError, NormalizationRules, Normalizer};

use crate::error::{CoreError, Result};
use crate::result::FileProcessingResult;

/// Filename prefix of the backlog export.
pub const DEFAULT_EXPORT_PREFIX: &str = "backlog";

/// Processes backlog exports found in a downloads directory.
///
/// One instance handles one run at a time; the loader and normalizer carry
/// no state between calls.
#[derive(Debug, Clone)]
pub struct BacklogProcessor {
    downloads_dir: PathBuf,
    prefix: String,
    loader: ChunkedLoader,
    normalizer: Normalizer,
    run_timestamp: Option<NaiveDateTime>,
}

impl BacklogProcessor {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            loader: ChunkedLoader::default(),
            normalizer: Normalizer::default(),
            run_timestamp: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_loader_options(mut self, options: LoaderOptions) -> Self {
        self.loader = ChunkedLoader::new(options);
        self
    }

    pub fn with_rules(mut self, rules: NormalizationRules) -> Self {
        self.normalizer = Normalizer::new(rules);
        self
    }

    /// Timestamp injected into every row when a call does not supply one.
    pub fn with_run_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.run_timestamp = Some(timestamp);
        self
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Process `path`, or the newest `<prefix>*` export when `path` is `None`.
    ///
    /// `run_timestamp` overrides the processor-level timestamp for this call.
    /// Every failure is reported in the returned result.
    pub fn process_most_recent_file(
        &self,
        path: Option<&Path>,
        run_timestamp: Option<NaiveDateTime>,
    ) -> FileProcessingResult {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match find_most_recent(&self.downloads_dir, &self.prefix) {
                Ok(export) => export.path,
                Err(error) => {
                    tracing::error!(error = %error, "Export discovery failed");
                    return FileProcessingResult::failed(None, &error);
                }
            },
        };
        self.process_file(&path, run_timestamp)
    }

    /// Load and normalize one export.
    pub fn process_file(
        &self,
        path: &Path,
        run_timestamp: Option<NaiveDateTime>,
    ) -> FileProcessingResult {
        let span = tracing::info_span!("ingest", path = %path.display());
        let _guard = span.enter();

        let timestamp = run_timestamp.or(self.run_timestamp);
        if timestamp.is_none() {
            tracing::warn!("No run timestamp supplied; output will not carry one");
        }

        let mut warnings: Vec<ColumnWarning> = Vec::new();
        let loaded = self.loader.load(path, |chunk: DataFrame| {
            let normalized = self.normalizer.normalize(chunk, timestamp)?;
            for warning in normalized.warnings {
                if !warnings
                    .iter()
                    .any(|w| w.column == warning.column && w.step == warning.step)
                {
                    warnings.push(warning);
                }
            }
            Ok::<_, NormalizationError>(normalized.table)
        });

        match loaded {
            Ok(report) => {
                tracing::info!(
                    rows = report.rows,
                    chunks = report.chunks,
                    encoding = report.encoding.name(),
                    warnings = warnings.len(),
                    "Export processed"
                );
                FileProcessingResult::succeeded(path.to_path_buf(), report, warnings)
            }
            Err(error) => {
                tracing::error!(error = %error, "Export processing failed");
                FileProcessingResult::failed(Some(path.to_path_buf()), &error)
            }
        }
    }

    /// Delete the newest `<prefix>*` export and return its path.
    pub fn delete_most_recent_file(&self) -> Result<PathBuf> {
        let export = find_most_recent(&self.downloads_dir, &self.prefix)?;
        self.delete_file(&export.path)?;
        Ok(export.path)
    }

    /// Delete one export, whatever its name.
    pub fn delete_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|source| CoreError::Delete {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Deleted export");
        Ok(())
    }
}
