//! Data model for the backlog export.
//!
//! The export is produced by a remote work-order system with Portuguese,
//! human-readable headers. This crate owns the fixed dictionary that maps
//! those headers to canonical snake_case names, and the lists of columns
//! that receive typed treatment during normalization.

pub mod columns;
pub mod schema;

pub use columns::{
    DATE_COLUMNS, FREE_TEXT_COLUMN, ID_COLUMNS, ISO_DATETIME_FORMAT, LOCALE_DATETIME_FORMAT,
    RUN_TIMESTAMP_COLUMN, SENTINEL_VALUES, is_sentinel,
};
pub use schema::{BACKLOG_SCHEMA_VERSION, ColumnSchema};
