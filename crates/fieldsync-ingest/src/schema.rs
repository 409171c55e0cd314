//! Column type inference from a sample and uniform coercion of chunks.
//!
//! Letting every chunk infer its own types drifts on sparse columns (a chunk
//! where a column is entirely empty looks different from one where it is
//! populated) and breaks concatenation. The types are captured once from a
//! sample into a [`TypeSchemaCache`] and every chunk is coerced to it.

use polars::prelude::{Column, DataFrame};

use fieldsync_model::is_sentinel;

use crate::encoding::RawRow;
use crate::error::{IngestError, Result};

/// Scalar type of a column as inferred from a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        }
    }

    /// Narrowest type that can hold both `self` and `other`.
    fn widen(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (ColumnType::Text, _) | (_, ColumnType::Text) => ColumnType::Text,
            (ColumnType::Float, _) | (_, ColumnType::Float) => ColumnType::Float,
            _ => ColumnType::Integer,
        }
    }

    fn of_value(value: &str) -> ColumnType {
        if has_redundant_leading_zero(value) {
            ColumnType::Text
        } else if is_integer_literal(value) {
            ColumnType::Integer
        } else if is_float_literal(value) {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }
}

/// `007`, `-01`, `00.5`: zero-padded codes that a numeric parse would flatten.
fn has_redundant_leading_zero(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value)
        .as_bytes();
    digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit()
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    value.parse::<i64>().is_ok()
}

fn is_float_literal(value: &str) -> bool {
    value.bytes().any(|b| b.is_ascii_digit()) && value.parse::<f64>().is_ok()
}

/// Column name → type mapping captured once per load.
///
/// Immutable after construction; a chunked load builds one from its sample
/// and threads it by reference into every chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchemaCache {
    columns: Vec<(String, ColumnType)>,
}

impl TypeSchemaCache {
    /// Infer column types from `rows`.
    ///
    /// Empty and sentinel values carry no type evidence. A column with no
    /// evidence at all is text.
    pub fn infer(headers: &[String], rows: &[RawRow]) -> Self {
        let mut inferred: Vec<Option<ColumnType>> = vec![None; headers.len()];
        for row in rows {
            for (idx, value) in row.iter().enumerate() {
                let Some(value) = value.as_deref() else {
                    continue;
                };
                if is_sentinel(value) {
                    continue;
                }
                let Some(slot) = inferred.get_mut(idx) else {
                    continue;
                };
                let observed = ColumnType::of_value(value);
                *slot = Some(match *slot {
                    Some(current) => current.widen(observed),
                    None => observed,
                });
            }
        }
        let columns = headers
            .iter()
            .cloned()
            .zip(
                inferred
                    .into_iter()
                    .map(|ty| ty.unwrap_or(ColumnType::Text)),
            )
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, ty)| *ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Build a DataFrame from raw rows, coercing every column to its cached type.
    ///
    /// `chunk` is only used for error reporting. A value that does not fit
    /// its column's type fails the whole chunk.
    pub fn materialize(&self, rows: Vec<RawRow>, chunk: usize) -> Result<DataFrame> {
        let width = self.columns.len();
        let mut values: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            for (idx, value) in row.into_iter().enumerate().take(width) {
                values[idx].push(value);
            }
        }

        let mut columns = Vec::with_capacity(width);
        for ((name, ty), raw) in self.columns.iter().zip(values) {
            columns.push(coerce_column(name, *ty, raw, chunk)?);
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn coerce_column(
    name: &str,
    ty: ColumnType,
    raw: Vec<Option<String>>,
    chunk: usize,
) -> Result<Column> {
    let mismatch = |value: &str| IngestError::ChunkCoercion {
        chunk,
        column: name.to_string(),
        value: value.to_string(),
        expected: ty.as_str(),
    };
    let column = match ty {
        ColumnType::Text => Column::new(name.into(), raw),
        ColumnType::Integer => {
            let mut parsed = Vec::with_capacity(raw.len());
            for value in &raw {
                parsed.push(match value.as_deref() {
                    None => None,
                    Some(v) if is_sentinel(v) => None,
                    Some(v) if has_redundant_leading_zero(v) => return Err(mismatch(v)),
                    Some(v) => Some(v.parse::<i64>().map_err(|_| mismatch(v))?),
                });
            }
            Column::new(name.into(), parsed)
        }
        ColumnType::Float => {
            let mut parsed = Vec::with_capacity(raw.len());
            for value in &raw {
                parsed.push(match value.as_deref() {
                    None => None,
                    Some(v) if is_sentinel(v) => None,
                    Some(v) if has_redundant_leading_zero(v) => return Err(mismatch(v)),
                    Some(v) => Some(v.parse::<f64>().map_err(|_| mismatch(v))?),
                });
            }
            Column::new(name.into(), parsed)
        }
    };
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;

    fn row(values: &[&str]) -> RawRow {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_infer_types() {
        let cache = TypeSchemaCache::infer(
            &headers(&["id", "score", "name", "empty", "code"]),
            &[
                row(&["1", "1.5", "Ana", "", "007"]),
                row(&["2", "3", "Bia", "", "010"]),
            ],
        );
        assert_eq!(cache.get("id"), Some(ColumnType::Integer));
        assert_eq!(cache.get("score"), Some(ColumnType::Float));
        assert_eq!(cache.get("name"), Some(ColumnType::Text));
        assert_eq!(cache.get("empty"), Some(ColumnType::Text));
        assert_eq!(cache.get("code"), Some(ColumnType::Text));
    }

    #[test]
    fn test_zero_padded_values_stay_text() {
        let cache = TypeSchemaCache::infer(
            &headers(&["id", "ratio", "signed"]),
            &[
                row(&["11", "0.5", "-3"]),
                row(&["0042", "00.5", "-007"]),
            ],
        );
        assert_eq!(cache.get("id"), Some(ColumnType::Text));
        assert_eq!(cache.get("ratio"), Some(ColumnType::Text));
        assert_eq!(cache.get("signed"), Some(ColumnType::Text));
    }

    #[test]
    fn test_single_zero_and_fractions_are_numeric() {
        let cache = TypeSchemaCache::infer(
            &headers(&["count", "ratio"]),
            &[row(&["0", "0.25"]), row(&["10", "-0.5"])],
        );
        assert_eq!(cache.get("count"), Some(ColumnType::Integer));
        assert_eq!(cache.get("ratio"), Some(ColumnType::Float));
    }

    #[test]
    fn test_zero_padded_value_in_numeric_chunk_fails() {
        let cache = TypeSchemaCache::infer(&headers(&["id", "score"]), &[row(&["11", "1.5"])]);
        let id = cache.materialize(vec![row(&["0042", "2.5"])], 2);
        assert!(matches!(
            id,
            Err(IngestError::ChunkCoercion { chunk: 2, ref value, .. }) if value == "0042"
        ));
        let score = cache.materialize(vec![row(&["12", "03.5"])], 3);
        assert!(matches!(
            score,
            Err(IngestError::ChunkCoercion { chunk: 3, ref column, .. }) if column == "score"
        ));
    }

    #[test]
    fn test_sentinels_carry_no_type_evidence() {
        let cache = TypeSchemaCache::infer(
            &headers(&["id"]),
            &[row(&["nan"]), row(&["12"]), row(&["None"])],
        );
        assert_eq!(cache.get("id"), Some(ColumnType::Integer));
    }

    #[test]
    fn test_materialize_coerces_to_cached_types() {
        let cache = TypeSchemaCache::infer(&headers(&["id", "name"]), &[row(&["1", "Ana"])]);
        let df = cache
            .materialize(vec![row(&["5", "Caio"]), row(&["", ""])], 0)
            .unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("name").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_sparse_chunk_keeps_sampled_type() {
        let cache = TypeSchemaCache::infer(&headers(&["id"]), &[row(&["1"])]);
        let df = cache.materialize(vec![row(&[""]), row(&[""])], 3).unwrap();
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_value_outside_cached_type_fails_chunk() {
        let cache = TypeSchemaCache::infer(&headers(&["id"]), &[row(&["1"])]);
        let result = cache.materialize(vec![row(&["abc"])], 7);
        assert!(matches!(
            result,
            Err(IngestError::ChunkCoercion { chunk: 7, ref column, .. }) if column == "id"
        ));
    }
}
