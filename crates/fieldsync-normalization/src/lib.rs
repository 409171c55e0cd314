//! Backlog table normalization.
//!
//! Turns a raw export table (or one chunk of it) into the canonical shape:
//! canonical column names, an optional run timestamp, ISO date-times,
//! digit-string identifiers and a single null marker in place of the
//! export's textual "empty" tokens.
//!
//! # Example
//!
//! ```ignore
//! use fieldsync_normalization::Normalizer;
//!
//! let normalized = Normalizer::default().normalize(chunk, Some(run_started))?;
//! for warning in &normalized.warnings {
//!     eprintln!("{warning}");
//! }
//! ```
//!
//! Column-level problems never fail the call; they come back as
//! [`ColumnWarning`]s and the column is left as it was.

mod error;
mod normalizer;
mod rules;

pub mod values;

pub use error::{NormalizationError, Result};
pub use normalizer::{ColumnWarning, NormalizationStep, Normalized, Normalizer};
pub use rules::NormalizationRules;
