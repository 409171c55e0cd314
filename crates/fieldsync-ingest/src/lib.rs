//! Backlog export ingestion.
//!
//! This crate locates the raw export in the downloads directory and loads it
//! into a Polars DataFrame, tolerating an unknown encoding and an unknown
//! size.
//!
//! # Features
//!
//! - **Discovery**: newest `<prefix>*` file by modification time
//! - **Encoding fallback**: ordered candidate encodings, no lossy decoding
//! - **Type cache**: column types captured from a sample, applied to every chunk
//! - **Chunked loading**: single pass for small files, bounded chunks for large ones
//!
//! # Example
//!
//! ```ignore
//! use fieldsync_ingest::{ChunkedLoader, LoaderOptions, find_most_recent};
//!
//! let export = find_most_recent(downloads, "backlog")?;
//! let report = ChunkedLoader::new(LoaderOptions::default())
//!     .load(&export.path, |chunk| Ok::<_, String>(chunk))?;
//! ```

mod discovery;
mod encoding;
mod error;
mod loader;
mod schema;

// === Error Types ===
pub use error::{IngestError, Result};

// === Discovery ===
pub use discovery::{RawExport, find_most_recent, list_exports};

// === Encoding-Resilient Reading ===
pub use encoding::{
    DEFAULT_DELIMITER, DecodedCsv, EncodedCsvReader, EncodingPolicy, RawRow, read_with_fallback,
};

// === Type Schema Cache ===
pub use schema::{ColumnType, TypeSchemaCache};

// === Loading ===
pub use loader::{
    ChunkedLoader, DEFAULT_AVG_ROW_BYTES, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_SIZE,
    DEFAULT_SIZE_THRESHOLD_BYTES, LoadReport, LoadStrategy, LoaderOptions,
};
