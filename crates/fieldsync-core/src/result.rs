//! The value returned across the processing boundary.

use std::fmt;
use std::path::PathBuf;

use polars::prelude::DataFrame;

use fieldsync_ingest::{IngestError, LoadReport};
use fieldsync_normalization::ColumnWarning;

/// Failure category of an unsuccessful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No export matches the prefix.
    NotFound,
    /// No candidate encoding could read the file (or its sample).
    EncodingDetectionFailed,
    /// Structural CSV error.
    ParseFailure,
    /// A chunk could not be coerced or normalized.
    ChunkFailure,
    /// File system error while reading.
    Io,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not found",
            FailureKind::EncodingDetectionFailed => "encoding detection failed",
            FailureKind::ParseFailure => "parse failure",
            FailureKind::ChunkFailure => "chunk failure",
            FailureKind::Io => "i/o",
        }
    }

    fn of(error: &IngestError) -> Self {
        match error {
            IngestError::NotFound { .. } | IngestError::DirectoryNotFound { .. } => {
                FailureKind::NotFound
            }
            IngestError::UnsupportedEncoding { .. }
            | IngestError::EncodingDetectionFailed { .. }
            | IngestError::Decode { .. } => FailureKind::EncodingDetectionFailed,
            IngestError::Parse { .. } => FailureKind::ParseFailure,
            IngestError::ChunkCoercion { .. }
            | IngestError::ChunkProcessing { .. }
            | IngestError::DataFrame { .. } => FailureKind::ChunkFailure,
            IngestError::DirectoryRead { .. } | IngestError::FileRead { .. } => FailureKind::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing one export.
///
/// Always produced, never an `Err`: callers inspect [`success`](Self::success).
/// A failed result carries no table and no row or chunk counts.
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub success: bool,
    pub message: String,
    pub table: Option<DataFrame>,
    /// Chunks processed; zero for a single-pass load.
    pub chunks_processed: usize,
    pub rows: usize,
    pub path: Option<PathBuf>,
    /// Encoding that decoded the file.
    pub encoding: Option<&'static str>,
    pub skipped_rows: usize,
    pub warnings: Vec<ColumnWarning>,
    pub failure: Option<FailureKind>,
}

impl FileProcessingResult {
    pub(crate) fn succeeded(path: PathBuf, report: LoadReport, warnings: Vec<ColumnWarning>) -> Self {
        let message = if report.chunks > 0 {
            format!(
                "processed {} rows in {} chunks from {}",
                report.rows,
                report.chunks,
                path.display()
            )
        } else {
            format!("processed {} rows from {}", report.rows, path.display())
        };
        Self {
            success: true,
            message,
            table: Some(report.table),
            chunks_processed: report.chunks,
            rows: report.rows,
            path: Some(path),
            encoding: Some(report.encoding.name()),
            skipped_rows: report.skipped_rows,
            warnings,
            failure: None,
        }
    }

    pub(crate) fn failed(path: Option<PathBuf>, error: &IngestError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            table: None,
            chunks_processed: 0,
            rows: 0,
            path,
            encoding: None,
            skipped_rows: 0,
            warnings: Vec::new(),
            failure: Some(FailureKind::of(error)),
        }
    }
}
