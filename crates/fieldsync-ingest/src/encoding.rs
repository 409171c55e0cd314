//! Delimited-text reading with an ordered encoding fallback.
//!
//! The export producer does not declare its encoding. Each candidate in an
//! [`EncodingPolicy`] is tried in order and the first one that decodes every
//! field without replacement characters (and parses structurally) wins. A
//! failed candidate is a hard failure for that candidate; nothing is decoded
//! lossily.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::{IngestError, Result};

/// Field delimiter used by the export.
pub const DEFAULT_DELIMITER: u8 = b';';

/// One parsed row. `None` marks an empty field.
pub type RawRow = Vec<Option<String>>;

/// Ordered list of candidate encodings, most probable first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingPolicy {
    candidates: Vec<&'static Encoding>,
}

impl EncodingPolicy {
    pub fn new(candidates: Vec<&'static Encoding>) -> Self {
        Self { candidates }
    }

    /// Latin-1 family before UTF-8, matching the producer's locale.
    pub fn latin_first() -> Self {
        Self::new(vec![WINDOWS_1252, UTF_8])
    }

    pub fn utf8_first() -> Self {
        Self::new(vec![UTF_8, WINDOWS_1252])
    }

    /// Build a policy from WHATWG labels (`"latin1"`, `"utf-8"`, ...).
    ///
    /// Returns the first label that is not recognised as the error.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> std::result::Result<Self, String> {
        let mut candidates = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            let encoding = Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| label.to_string())?;
            candidates.push(encoding);
        }
        Ok(Self::new(candidates))
    }

    pub fn candidates(&self) -> &[&'static Encoding] {
        &self.candidates
    }

    /// Candidate order for a specific file.
    ///
    /// A byte-order mark is unambiguous, so the encoding it names is moved
    /// to the front of the list.
    fn ordered_for(&self, path: &Path) -> Result<Vec<&'static Encoding>> {
        let mut order = self.candidates.clone();
        if let Some(bom_encoding) = sniff_bom(path)? {
            order.retain(|enc| *enc != bom_encoding);
            order.insert(0, bom_encoding);
        }
        Ok(order)
    }
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self::latin_first()
    }
}

fn sniff_bom(path: &Path) -> Result<Option<&'static Encoding>> {
    use std::io::Read;

    let mut file = open_file(path)?;
    let mut buffer = [0u8; 3];
    let read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Encoding::for_bom(&buffer[..read]).map(|(encoding, _)| encoding))
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// A fully or partially read file together with the encoding that worked.
#[derive(Debug, Clone)]
pub struct DecodedCsv {
    pub encoding: &'static Encoding,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Rows dropped because they had more fields than the header.
    pub skipped_rows: usize,
}

/// Streaming reader bound to one encoding.
pub struct EncodedCsvReader {
    path: PathBuf,
    encoding: &'static Encoding,
    reader: csv::Reader<File>,
    headers: Vec<String>,
    record: ByteRecord,
    skipped_rows: usize,
}

impl EncodedCsvReader {
    /// Open `path` and decode its header row with `encoding`.
    pub fn open(path: &Path, encoding: &'static Encoding, delimiter: u8) -> Result<Self> {
        let file = open_file(path)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let raw_headers = reader
            .byte_headers()
            .map_err(|e| parse_error(path, &e))?
            .clone();
        let mut headers = Vec::with_capacity(raw_headers.len());
        for field in raw_headers.iter() {
            let decoded = decode_field(encoding, field).ok_or_else(|| IngestError::Decode {
                path: path.to_path_buf(),
                encoding: encoding.name(),
                record: 0,
            })?;
            headers.push(normalize_header(&decoded));
        }

        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            reader,
            headers: dedupe_headers(headers),
            record: ByteRecord::new(),
            skipped_rows: 0,
        })
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Read up to `limit` rows. An empty result means end of file.
    pub fn read_rows(&mut self, limit: usize) -> Result<Vec<RawRow>> {
        let width = self.headers.len();
        let mut rows = Vec::new();
        while rows.len() < limit {
            let more = self
                .reader
                .read_byte_record(&mut self.record)
                .map_err(|e| parse_error(&self.path, &e))?;
            if !more {
                break;
            }
            if self.record.len() > width {
                self.skipped_rows += 1;
                tracing::warn!(
                    path = %self.path.display(),
                    line = self.record.position().map(csv::Position::line),
                    fields = self.record.len(),
                    expected = width,
                    "Skipping row with too many fields"
                );
                continue;
            }
            let mut row = Vec::with_capacity(width);
            for field in self.record.iter() {
                if field.is_empty() {
                    row.push(None);
                    continue;
                }
                let decoded =
                    decode_field(self.encoding, field).ok_or_else(|| IngestError::Decode {
                        path: self.path.clone(),
                        encoding: self.encoding.name(),
                        record: self.record.position().map_or(0, csv::Position::record),
                    })?;
                row.push(Some(decoded));
            }
            row.resize(width, None);
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Parse `path` with each candidate encoding in turn.
///
/// Reads at most `limit` data rows (all rows when `None`). Fails with
/// [`IngestError::UnsupportedEncoding`] only when every candidate fails.
pub fn read_with_fallback(
    path: &Path,
    policy: &EncodingPolicy,
    delimiter: u8,
    limit: Option<usize>,
) -> Result<DecodedCsv> {
    let mut attempts = Vec::new();
    for encoding in policy.ordered_for(path)? {
        match read_with_encoding(path, encoding, delimiter, limit) {
            Ok(decoded) => {
                tracing::debug!(
                    path = %path.display(),
                    encoding = encoding.name(),
                    rows = decoded.rows.len(),
                    "Decoded export"
                );
                return Ok(decoded);
            }
            Err(err @ (IngestError::Decode { .. } | IngestError::Parse { .. })) => {
                tracing::debug!(
                    path = %path.display(),
                    encoding = encoding.name(),
                    error = %err,
                    "Encoding candidate rejected"
                );
                attempts.push(encoding.name().to_string());
            }
            Err(other) => return Err(other),
        }
    }
    Err(IngestError::UnsupportedEncoding {
        path: path.to_path_buf(),
        attempts,
    })
}

fn read_with_encoding(
    path: &Path,
    encoding: &'static Encoding,
    delimiter: u8,
    limit: Option<usize>,
) -> Result<DecodedCsv> {
    let mut reader = EncodedCsvReader::open(path, encoding, delimiter)?;
    let rows = reader.read_rows(limit.unwrap_or(usize::MAX))?;
    Ok(DecodedCsv {
        encoding,
        headers: reader.headers().to_vec(),
        rows,
        skipped_rows: reader.skipped_rows(),
    })
}

fn decode_field(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
}

fn parse_error(path: &Path, err: &csv::Error) -> IngestError {
    IngestError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim_start_matches("\u{ef}\u{bb}\u{bf}")
        .trim()
        .to_string()
}

/// Disambiguate repeated headers as `name`, `name.1`, `name.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut result = Vec::with_capacity(headers.len());
    for header in headers {
        let count = seen.entry(header.clone()).or_insert(0);
        if *count == 0 {
            result.push(header);
        } else {
            result.push(format!("{header}.{count}"));
        }
        *count += 1;
    }
    result
}
