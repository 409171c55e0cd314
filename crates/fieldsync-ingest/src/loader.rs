//! Single-pass or chunked loading of an export.
//!
//! Small files are decoded in one pass. Large files are sampled first to lock
//! in the encoding and capture a [`TypeSchemaCache`], then streamed in
//! fixed-size row chunks. Each chunk goes through a caller-supplied processor
//! before the next one is read, so peak memory stays around one raw chunk plus
//! the processed output accumulated so far.
//!
//! # Usage
//!
//! ```ignore
//! use fieldsync_ingest::{ChunkedLoader, LoaderOptions};
//!
//! let loader = ChunkedLoader::new(LoaderOptions::default().with_chunk_size(5_000));
//! let report = loader.load(&path, |chunk| Ok::<_, String>(chunk))?;
//! println!("{} rows in {} chunks", report.rows, report.chunks);
//! ```

use std::fmt::Display;
use std::path::Path;

use encoding_rs::Encoding;
use polars::prelude::DataFrame;

use crate::encoding::{DEFAULT_DELIMITER, EncodedCsvReader, EncodingPolicy, read_with_fallback};
use crate::error::{IngestError, Result};
use crate::schema::TypeSchemaCache;

/// Default file size (in bytes) above which chunked loading is used.
/// Default: 10 MB
pub const DEFAULT_SIZE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

/// Default estimated bytes per row for the row-count estimate.
pub const DEFAULT_AVG_ROW_BYTES: u64 = 1024;

/// Default rows per chunk (also the default row-count threshold).
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Default number of rows sampled for encoding and type detection.
pub const DEFAULT_SAMPLE_SIZE: usize = 1_000;

/// Tunables for [`ChunkedLoader`].
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Files larger than this are loaded in chunks.
    pub size_threshold_bytes: u64,

    /// Average row size used to estimate the row count from the file size.
    pub avg_row_bytes: u64,

    /// Files with more estimated rows than this are loaded in chunks.
    pub row_threshold: u64,

    /// Rows per chunk.
    pub chunk_size: usize,

    /// Rows sampled to detect encoding and infer column types.
    pub sample_size: usize,

    /// Emit a progress event every this many rows.
    pub progress_interval: usize,

    /// Field delimiter.
    pub delimiter: u8,

    /// Candidate encodings, most probable first.
    pub encodings: EncodingPolicy,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD_BYTES,
            avg_row_bytes: DEFAULT_AVG_ROW_BYTES,
            row_threshold: DEFAULT_CHUNK_SIZE as u64,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            progress_interval: DEFAULT_CHUNK_SIZE * 5,
            delimiter: DEFAULT_DELIMITER,
            encodings: EncodingPolicy::default(),
        }
    }
}

impl LoaderOptions {
    /// Set the byte-size threshold for chunked loading.
    pub fn with_size_threshold(mut self, bytes: u64) -> Self {
        self.size_threshold_bytes = bytes;
        self
    }

    /// Set the estimated-row-count threshold for chunked loading.
    pub fn with_row_threshold(mut self, rows: u64) -> Self {
        self.row_threshold = rows;
        self
    }

    /// Set the average row size used for the row estimate.
    pub fn with_avg_row_bytes(mut self, bytes: u64) -> Self {
        self.avg_row_bytes = bytes.max(1);
        self
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set the sample size for encoding and type detection.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size.max(1);
        self
    }

    /// Set the progress reporting interval.
    pub fn with_progress_interval(mut self, rows: usize) -> Self {
        self.progress_interval = rows.max(1);
        self
    }

    /// Set the encoding policy.
    pub fn with_encodings(mut self, encodings: EncodingPolicy) -> Self {
        self.encodings = encodings;
        self
    }

    /// Set the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Pick a strategy for a file of `size_bytes`.
    ///
    /// Exceeding either the byte threshold or the estimated row threshold
    /// selects chunked loading.
    pub fn strategy_for_size(&self, size_bytes: u64) -> LoadStrategy {
        let estimated_rows = size_bytes / self.avg_row_bytes.max(1);
        if size_bytes > self.size_threshold_bytes || estimated_rows > self.row_threshold {
            LoadStrategy::Chunked
        } else {
            LoadStrategy::SinglePass
        }
    }
}

/// How a file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    SinglePass,
    Chunked,
}

/// Outcome of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Processed table, rows in original file order.
    pub table: DataFrame,
    /// Encoding that decoded the file.
    pub encoding: &'static Encoding,
    pub strategy: LoadStrategy,
    /// Data rows read.
    pub rows: usize,
    /// Chunks processed; zero for a single-pass load.
    pub chunks: usize,
    /// Rows skipped for having more fields than the header.
    pub skipped_rows: usize,
    /// Column types the table was coerced to.
    pub schema: TypeSchemaCache,
}

/// Loads one export at a time.
#[derive(Debug, Clone, Default)]
pub struct ChunkedLoader {
    options: LoaderOptions,
}

impl ChunkedLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Strategy that [`ChunkedLoader::load`] would use for `path`.
    pub fn strategy_for(&self, path: &Path) -> Result<LoadStrategy> {
        let metadata = std::fs::metadata(path).map_err(|e| IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.options.strategy_for_size(metadata.len()))
    }

    /// Load `path`, passing each chunk (or the whole table) through `process`.
    ///
    /// Any failure, including one returned by `process`, aborts the load;
    /// no partial table is returned.
    pub fn load<F, E>(&self, path: &Path, process: F) -> Result<LoadReport>
    where
        F: FnMut(DataFrame) -> std::result::Result<DataFrame, E>,
        E: Display,
    {
        let size = std::fs::metadata(path)
            .map_err(|e| IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        let strategy = self.options.strategy_for_size(size);
        let size_mb = size as f64 / (1024.0 * 1024.0);
        match strategy {
            LoadStrategy::SinglePass => {
                tracing::info!(
                    path = %path.display(),
                    size_mb = %format!("{size_mb:.2}"),
                    "Loading export in a single pass"
                );
                self.load_single_pass(path, process)
            }
            LoadStrategy::Chunked => {
                tracing::info!(
                    path = %path.display(),
                    size_mb = %format!("{size_mb:.2}"),
                    estimated_rows = size / self.options.avg_row_bytes.max(1),
                    chunk_size = self.options.chunk_size,
                    "Large export detected, loading in chunks"
                );
                self.load_chunked(path, process)
            }
        }
    }

    fn load_single_pass<F, E>(&self, path: &Path, mut process: F) -> Result<LoadReport>
    where
        F: FnMut(DataFrame) -> std::result::Result<DataFrame, E>,
        E: Display,
    {
        let decoded = read_with_fallback(path, &self.options.encodings, self.options.delimiter, None)?;
        let schema = TypeSchemaCache::infer(&decoded.headers, &decoded.rows);
        let rows = decoded.rows.len();
        let frame = schema.materialize(decoded.rows, 0)?;
        let table = process(frame).map_err(|e| IngestError::ChunkProcessing {
            chunk: 0,
            message: e.to_string(),
        })?;
        Ok(LoadReport {
            table,
            encoding: decoded.encoding,
            strategy: LoadStrategy::SinglePass,
            rows,
            chunks: 0,
            skipped_rows: decoded.skipped_rows,
            schema,
        })
    }

    fn load_chunked<F, E>(&self, path: &Path, mut process: F) -> Result<LoadReport>
    where
        F: FnMut(DataFrame) -> std::result::Result<DataFrame, E>,
        E: Display,
    {
        let options = &self.options;

        // Pass 1: lock in the encoding and capture column types.
        let sample = match read_with_fallback(
            path,
            &options.encodings,
            options.delimiter,
            Some(options.sample_size),
        ) {
            Ok(sample) => sample,
            Err(IngestError::UnsupportedEncoding { .. }) => {
                return Err(IngestError::EncodingDetectionFailed {
                    path: path.to_path_buf(),
                });
            }
            Err(other) => return Err(other),
        };
        let schema = TypeSchemaCache::infer(&sample.headers, &sample.rows);
        let encoding = sample.encoding;
        drop(sample);
        tracing::info!(
            path = %path.display(),
            encoding = encoding.name(),
            columns = schema.len(),
            "Processing export with detected encoding"
        );

        // Pass 2: stream the whole file with the fixed encoding and schema.
        let mut reader = EncodedCsvReader::open(path, encoding, options.delimiter)?;
        let mut table: Option<DataFrame> = None;
        let mut total_rows = 0usize;
        let mut chunks = 0usize;
        loop {
            let rows = reader.read_rows(options.chunk_size)?;
            if rows.is_empty() {
                break;
            }
            let chunk_rows = rows.len();
            let frame = schema.materialize(rows, chunks)?;
            let processed = process(frame).map_err(|e| IngestError::ChunkProcessing {
                chunk: chunks,
                message: e.to_string(),
            })?;
            match table.as_mut() {
                Some(acc) => {
                    acc.vstack_mut(&processed)?;
                }
                None => table = Some(processed),
            }

            let previous = total_rows;
            total_rows += chunk_rows;
            chunks += 1;
            if total_rows / options.progress_interval > previous / options.progress_interval {
                tracing::info!(rows = total_rows, chunks, "Progress");
            }
        }

        let mut table = match table {
            Some(table) => table,
            None => {
                let empty = schema.materialize(Vec::new(), 0)?;
                process(empty).map_err(|e| IngestError::ChunkProcessing {
                    chunk: 0,
                    message: e.to_string(),
                })?
            }
        };
        table.as_single_chunk_par();

        tracing::info!(
            rows = total_rows,
            chunks,
            skipped = reader.skipped_rows(),
            "Consolidated chunks"
        );

        Ok(LoadReport {
            table,
            encoding,
            strategy: LoadStrategy::Chunked,
            rows: total_rows,
            chunks,
            skipped_rows: reader.skipped_rows(),
            schema,
        })
    }
}
