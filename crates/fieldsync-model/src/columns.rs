//! Canonical column lists used by normalization.

/// Format of date-time values as exported by the remote system.
pub const LOCALE_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Canonical output format for every date-typed column.
pub const ISO_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the column injected with the run timestamp.
pub const RUN_TIMESTAMP_COLUMN: &str = "update_time";

/// Columns (canonical names) carrying locale-formatted date-times.
pub const DATE_COLUMNS: &[&str] = &[
    "criacao_do_ntt",
    "hora_de_criacao_da_atividade_aux",
    "eta",
    "fim",
    "inicio_gmg",
    "termino_gmg",
    "data_primeira_roteirizacao",
    "data_ultima_roteirizacao",
];

/// Columns (canonical names) carrying numeric identifiers.
pub const ID_COLUMNS: &[&str] = &["id_4field", "id_da_atividade"];

/// Free-text column that upstream sometimes delivers with a non-text type.
pub const FREE_TEXT_COLUMN: &str = "priorizacao_dispatching";

/// Literal tokens that stand in for "no value" in the export and in
/// stringified upstream values.
pub const SENTINEL_VALUES: &[&str] = &["", "nan", "None", "NaT"];

/// Returns true when `value` is one of [`SENTINEL_VALUES`].
pub fn is_sentinel(value: &str) -> bool {
    SENTINEL_VALUES.contains(&value)
}
