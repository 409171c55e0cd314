//! Sanity checks on a captured download before ingestion sees it.

use std::io::Read;
use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::error::{BrowserError, Result};

/// Bytes inspected when counting lines.
const HEAD_BYTES: u64 = 64 * 1024;

/// Check that `path` is non-empty and has at least a header and one row.
///
/// An invalid file is deleted before the error is returned.
pub fn validate_download(path: &Path) -> Result<()> {
    match check(path) {
        Ok(lines) => {
            tracing::info!(path = %path.display(), lines, "Download validated");
            Ok(())
        }
        Err(reason) => {
            tracing::error!(path = %path.display(), reason = %reason, "Discarding invalid download");
            if let Err(error) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %error, "Could not delete invalid download");
            }
            Err(BrowserError::DownloadInvalid {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}

fn check(path: &Path) -> std::result::Result<usize, String> {
    let file = std::fs::File::open(path).map_err(|e| format!("cannot open: {e}"))?;
    let size = file.metadata().map_err(|e| format!("cannot stat: {e}"))?.len();
    if size == 0 {
        return Err("file is empty".to_string());
    }

    let mut head = Vec::new();
    file.take(HEAD_BYTES)
        .read_to_end(&mut head)
        .map_err(|e| format!("cannot read: {e}"))?;
    let (text, _, _) = WINDOWS_1252.decode(&head);
    let lines = text.lines().filter(|line| !line.trim().is_empty()).take(2).count();
    if lines < 2 {
        return Err(format!("expected at least 2 lines, found {lines}"));
    }
    Ok(lines)
}
