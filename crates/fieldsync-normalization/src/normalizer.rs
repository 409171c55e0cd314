//! The ordered normalization steps over one table or chunk.

use std::fmt;

use chrono::NaiveDateTime;
use polars::prelude::{Column, DataFrame, DataType};

use fieldsync_model::{ISO_DATETIME_FORMAT, RUN_TIMESTAMP_COLUMN, is_sentinel};

use crate::error::{NormalizationError, Result};
use crate::rules::NormalizationRules;
use crate::values::{CanonicalId, canonical_id, normalize_datetime, value_to_text};

/// Step that produced a [`ColumnWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationStep {
    DateParse,
    IdCast,
    TextCoercion,
}

impl NormalizationStep {
    pub fn as_str(self) -> &'static str {
        match self {
            NormalizationStep::DateParse => "date",
            NormalizationStep::IdCast => "id",
            NormalizationStep::TextCoercion => "text",
        }
    }
}

/// A column the normalizer could not fully normalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnWarning {
    pub column: String,
    pub step: NormalizationStep,
    pub message: String,
}

impl fmt::Display for ColumnWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.column, self.step.as_str(), self.message)
    }
}

/// Best-effort table plus the columns that were left (partly) unnormalized.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: DataFrame,
    pub warnings: Vec<ColumnWarning>,
}

/// Applies [`NormalizationRules`] to tables.
///
/// Stateless between calls; the same instance normalizes every chunk of a
/// run. Normalizing an already normalized table returns it unchanged.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rules: NormalizationRules,
}

impl Normalizer {
    pub fn new(rules: NormalizationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &NormalizationRules {
        &self.rules
    }

    /// Normalize `table`.
    ///
    /// Steps run in order: rename, timestamp injection, date columns, id
    /// columns, free-text columns, sentinel collapse, text coercion.
    pub fn normalize(
        &self,
        table: DataFrame,
        run_timestamp: Option<NaiveDateTime>,
    ) -> Result<Normalized> {
        let height = table.height();
        let mut warnings = Vec::new();

        let mut columns = self.rename(table.take_columns())?;

        if let Some(timestamp) = run_timestamp {
            insert_run_timestamp(&mut columns, timestamp, height);
        }

        for column in &mut columns {
            if self.rules.is_date_column(column.name().as_str()) {
                if let Some(normalized) = normalize_date_column(column, &mut warnings)? {
                    *column = normalized;
                }
            }
        }

        for column in &mut columns {
            if self.rules.is_id_column(column.name().as_str()) {
                *column = normalize_id_column(column, &mut warnings)?;
            }
        }

        for column in &mut columns {
            if self.rules.is_free_text_column(column.name().as_str())
                && column.dtype() != &DataType::String
            {
                *column = stringify_column(column)?;
            }
        }

        for column in &mut columns {
            if let Some(collapsed) = collapse_sentinels(column)? {
                *column = collapsed;
            }
        }

        for column in &mut columns {
            if let Some(coerced) = coerce_text(column, &mut warnings)? {
                *column = coerced;
            }
        }

        for warning in &warnings {
            tracing::warn!(
                column = %warning.column,
                step = warning.step.as_str(),
                message = %warning.message,
                "Column left partly unnormalized"
            );
        }

        let table = DataFrame::new(columns)?;
        Ok(Normalized { table, warnings })
    }

    fn rename(&self, mut columns: Vec<Column>) -> Result<Vec<Column>> {
        let mut seen = std::collections::HashSet::with_capacity(columns.len());
        for column in &mut columns {
            let canonical = self
                .rules
                .schema
                .lookup(column.name().as_str())
                .map(str::to_string);
            if let Some(canonical) = canonical {
                column.rename(canonical.into());
            }
            if !seen.insert(column.name().to_string()) {
                return Err(NormalizationError::DuplicateColumn(column.name().to_string()));
            }
        }
        Ok(columns)
    }
}

/// Put the run timestamp first, replacing any timestamp from a previous pass.
fn insert_run_timestamp(columns: &mut Vec<Column>, timestamp: NaiveDateTime, height: usize) {
    columns.retain(|c| c.name().as_str() != RUN_TIMESTAMP_COLUMN);
    let stamp = timestamp.format(ISO_DATETIME_FORMAT).to_string();
    columns.insert(0, Column::new(RUN_TIMESTAMP_COLUMN.into(), vec![stamp; height]));
}

fn normalize_date_column(
    column: &Column,
    warnings: &mut Vec<ColumnWarning>,
) -> Result<Option<Column>> {
    let name = column.name().clone();
    match column.dtype() {
        DataType::String => {
            let values: Vec<Option<String>> = column
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|value| value.and_then(normalize_datetime))
                .collect();
            Ok(Some(Column::new(name, values)))
        }
        DataType::Null => Ok(Some(Column::new(name, vec![None::<String>; column.len()]))),
        other => {
            warnings.push(ColumnWarning {
                column: name.to_string(),
                step: NormalizationStep::DateParse,
                message: format!("expected text date-times, found {other}"),
            });
            Ok(None)
        }
    }
}

/// Ids become digit strings or null; an unsupported value makes the whole
/// column fall back to plain text so chunk schemas still agree.
fn normalize_id_column(column: &Column, warnings: &mut Vec<ColumnWarning>) -> Result<Column> {
    let mut values = Vec::with_capacity(column.len());
    let mut unsupported = None;
    for idx in 0..column.len() {
        let value = column.get(idx)?;
        match canonical_id(&value) {
            CanonicalId::Unsupported => {
                if unsupported.is_none() {
                    unsupported = value_to_text(&value);
                }
                values.push(None);
            }
            other => values.push(other.into_option()),
        }
    }

    if let Some(example) = unsupported {
        warnings.push(ColumnWarning {
            column: column.name().to_string(),
            step: NormalizationStep::IdCast,
            message: format!("value '{example}' is not a whole non-negative number"),
        });
        return stringify_column(column);
    }
    Ok(Column::new(column.name().clone(), values))
}

fn stringify_column(column: &Column) -> Result<Column> {
    let mut values = Vec::with_capacity(column.len());
    for idx in 0..column.len() {
        values.push(value_to_text(&column.get(idx)?));
    }
    Ok(Column::new(column.name().clone(), values))
}

/// Sentinel tokens in text columns and NaN in float columns become null.
fn collapse_sentinels(column: &Column) -> Result<Option<Column>> {
    let name = column.name().clone();
    match column.dtype() {
        DataType::String => {
            let strings = column.as_materialized_series().str()?;
            if !strings.into_iter().flatten().any(is_sentinel) {
                return Ok(None);
            }
            let values: Vec<Option<&str>> = strings
                .into_iter()
                .map(|value| value.filter(|v| !is_sentinel(v)))
                .collect();
            Ok(Some(Column::new(name, values)))
        }
        DataType::Float64 => {
            let floats = column.as_materialized_series().f64()?;
            if !floats.into_iter().flatten().any(f64::is_nan) {
                return Ok(None);
            }
            let values: Vec<Option<f64>> = floats
                .into_iter()
                .map(|value| value.filter(|v| !v.is_nan()))
                .collect();
            Ok(Some(Column::new(name, values)))
        }
        _ => Ok(None),
    }
}

/// Columns without a numeric or text type become text. Stringifying a null
/// keeps it null, and a literal "None" that survives becomes null.
fn coerce_text(column: &Column, warnings: &mut Vec<ColumnWarning>) -> Result<Option<Column>> {
    let dtype = column.dtype();
    if dtype.is_primitive_numeric() {
        return Ok(None);
    }
    let name = column.name().clone();
    match dtype {
        DataType::String => {
            let strings = column.as_materialized_series().str()?;
            if !strings.into_iter().flatten().any(|v| v == "None") {
                return Ok(None);
            }
            let values: Vec<Option<&str>> = strings
                .into_iter()
                .map(|value| value.filter(|v| *v != "None"))
                .collect();
            Ok(Some(Column::new(name, values)))
        }
        DataType::Null => Ok(Some(Column::new(name, vec![None::<String>; column.len()]))),
        DataType::Boolean => Ok(Some(stringify_column(column)?)),
        other => {
            warnings.push(ColumnWarning {
                column: name.to_string(),
                step: NormalizationStep::TextCoercion,
                message: format!("left as {other}"),
            });
            Ok(None)
        }
    }
}
