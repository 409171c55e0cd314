//! Error types for export ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating and loading an export.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// No file in the directory matches the export prefix.
    #[error("no file with prefix '{prefix}' found in {}", dir.display())]
    NotFound { dir: PathBuf, prefix: String },

    /// Directory not found or not readable.
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or stat a file.
    #[error("failed to read file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Encoding Errors ===
    /// Every candidate encoding failed to decode or parse the file.
    #[error("could not read {} with any of the encodings: {}", path.display(), attempts.join(", "))]
    UnsupportedEncoding {
        path: PathBuf,
        attempts: Vec<String>,
    },

    /// The sampling pass of a chunked load found no working encoding.
    #[error("could not detect the encoding of {}", path.display())]
    EncodingDetectionFailed { path: PathBuf },

    /// Bytes could not be decoded with the encoding locked in for this run.
    #[error("{encoding} decode error in {} at record {record}", path.display())]
    Decode {
        path: PathBuf,
        encoding: &'static str,
        record: u64,
    },

    // === CSV Parsing Errors ===
    /// Structural CSV error.
    #[error("failed to parse CSV {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A chunk value did not fit the type captured from the sample.
    #[error("chunk {chunk}: column '{column}' value '{value}' is not {expected}")]
    ChunkCoercion {
        chunk: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// The per-chunk processor rejected a chunk.
    #[error("chunk {chunk} processing failed: {message}")]
    ChunkProcessing { chunk: usize, message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::NotFound {
            dir: PathBuf::from("/downloads"),
            prefix: "backlog".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no file with prefix 'backlog' found in /downloads"
        );
    }

    #[test]
    fn test_unsupported_encoding_lists_attempts() {
        let err = IngestError::UnsupportedEncoding {
            path: PathBuf::from("a.csv"),
            attempts: vec!["windows-1252".to_string(), "UTF-8".to_string()],
        };
        assert!(err.to_string().ends_with("windows-1252, UTF-8"));
    }

    #[test]
    fn test_error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("test".into());
        let ingest_err: IngestError = polars_err.into();
        assert!(matches!(ingest_err, IngestError::DataFrame { .. }));
    }
}
