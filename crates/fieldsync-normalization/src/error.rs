//! Error types for normalization.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Frame-level normalization failures.
///
/// Column-level problems are not errors; they are reported as
/// [`ColumnWarning`](crate::ColumnWarning)s next to the best-effort table.
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// Two columns ended up with the same name after renaming.
    #[error("duplicate column '{0}' after renaming")]
    DuplicateColumn(String),

    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, NormalizationError>;
