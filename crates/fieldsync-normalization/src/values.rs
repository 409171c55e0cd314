//! Value-level conversions used by the column steps.
//!
//! These are pure functions over single cells; the executor maps them over
//! whole columns.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::AnyValue;

use fieldsync_model::{ISO_DATETIME_FORMAT, LOCALE_DATETIME_FORMAT, is_sentinel};

/// Accepted date-time layouts, export locale first.
///
/// The canonical ISO layout is accepted too, so an already normalized value
/// parses back to itself.
const DATETIME_FORMATS: &[&str] = &[
    LOCALE_DATETIME_FORMAT,
    "%d/%m/%Y %H:%M",
    ISO_DATETIME_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

/// Parse a date-time cell. Sentinels and unparseable text yield `None`.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if is_sentinel(trimmed) {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        // Four-digit years only, so the output always has the canonical shape.
        .filter(|dt| (0..=9999).contains(&dt.year()))
}

/// Reformat a date-time cell to `YYYY-MM-DD HH:MM:SS`, or `None`.
pub fn normalize_datetime(value: &str) -> Option<String> {
    parse_datetime(value).map(|dt| dt.format(ISO_DATETIME_FORMAT).to_string())
}

/// Outcome of canonicalizing one identifier cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalId {
    /// No identifier: null, a sentinel, or zero.
    Missing,
    /// Decimal digits only.
    Id(String),
    /// A value that is not a non-negative whole number.
    Unsupported,
}

impl CanonicalId {
    pub fn into_option(self) -> Option<String> {
        match self {
            CanonicalId::Id(id) => Some(id),
            CanonicalId::Missing | CanonicalId::Unsupported => None,
        }
    }
}

/// Canonicalize an identifier cell.
///
/// Whole floats lose their fractional artifacts (`123.0` → `"123"`), zero
/// means "no id", and digit strings keep their leading zeros.
pub fn canonical_id(value: &AnyValue<'_>) -> CanonicalId {
    match value {
        AnyValue::Null => CanonicalId::Missing,
        AnyValue::Int8(v) => from_integer(i64::from(*v)),
        AnyValue::Int16(v) => from_integer(i64::from(*v)),
        AnyValue::Int32(v) => from_integer(i64::from(*v)),
        AnyValue::Int64(v) => from_integer(*v),
        AnyValue::UInt8(v) => from_integer(i64::from(*v)),
        AnyValue::UInt16(v) => from_integer(i64::from(*v)),
        AnyValue::UInt32(v) => from_integer(i64::from(*v)),
        AnyValue::UInt64(0) => CanonicalId::Missing,
        AnyValue::UInt64(v) => CanonicalId::Id(v.to_string()),
        AnyValue::Float32(v) => from_float(f64::from(*v)),
        AnyValue::Float64(v) => from_float(*v),
        AnyValue::String(s) => from_text(s),
        AnyValue::StringOwned(s) => from_text(s),
        _ => CanonicalId::Unsupported,
    }
}

fn from_integer(value: i64) -> CanonicalId {
    match value {
        0 => CanonicalId::Missing,
        v if v < 0 => CanonicalId::Unsupported,
        v => CanonicalId::Id(v.to_string()),
    }
}

fn from_float(value: f64) -> CanonicalId {
    // 2^63, the first float outside i64.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    if value.is_nan() {
        CanonicalId::Missing
    } else if value.is_finite() && value.fract() == 0.0 && (0.0..I64_BOUND).contains(&value) {
        from_integer(value as i64)
    } else {
        CanonicalId::Unsupported
    }
}

fn from_text(value: &str) -> CanonicalId {
    let trimmed = value.trim();
    if is_sentinel(trimmed) {
        return CanonicalId::Missing;
    }
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        if trimmed.bytes().all(|b| b == b'0') {
            return CanonicalId::Missing;
        }
        return CanonicalId::Id(trimmed.to_string());
    }
    match trimmed.parse::<f64>() {
        Ok(v) => from_float(v),
        Err(_) => CanonicalId::Unsupported,
    }
}

/// Text rendering of any cell; nulls and NaN stay null.
pub fn value_to_text(value: &AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::Int8(v) => Some(v.to_string()),
        AnyValue::Int16(v) => Some(v.to_string()),
        AnyValue::Int32(v) => Some(v.to_string()),
        AnyValue::Int64(v) => Some(v.to_string()),
        AnyValue::UInt8(v) => Some(v.to_string()),
        AnyValue::UInt16(v) => Some(v.to_string()),
        AnyValue::UInt32(v) => Some(v.to_string()),
        AnyValue::UInt64(v) => Some(v.to_string()),
        AnyValue::Float32(v) => format_float(f64::from(*v)),
        AnyValue::Float64(v) => format_float(*v),
        AnyValue::String(s) => Some((*s).to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Boolean(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Formats a float without trailing zeros; NaN is null.
fn format_float(value: f64) -> Option<String> {
    if value.is_nan() {
        return None;
    }
    let s = format!("{value}");
    if !s.contains('.') {
        return Some(s);
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    Some(if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    })
}
