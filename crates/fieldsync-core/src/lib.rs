//! Backlog processing pipeline.
//!
//! Glues export discovery, the chunked loader and the normalizer together
//! behind [`BacklogProcessor`], and reports every run as a
//! [`FileProcessingResult`].

mod error;
mod processor;
mod result;

pub use error::{CoreError, Result};
pub use processor::{BacklogProcessor, DEFAULT_EXPORT_PREFIX};
pub use result::{FailureKind, FileProcessingResult};
