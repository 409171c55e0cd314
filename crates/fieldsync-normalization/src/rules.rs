//! Which columns receive which treatment.

use fieldsync_model::{ColumnSchema, DATE_COLUMNS, FREE_TEXT_COLUMN, ID_COLUMNS};

/// Column lists and dictionary driving a [`Normalizer`](crate::Normalizer).
///
/// Column lists use canonical (post-rename) names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationRules {
    pub schema: ColumnSchema,
    pub date_columns: Vec<String>,
    pub id_columns: Vec<String>,
    pub free_text_columns: Vec<String>,
}

impl NormalizationRules {
    /// Rules for the backlog export.
    pub fn backlog() -> Self {
        Self {
            schema: ColumnSchema::backlog(),
            date_columns: to_owned(DATE_COLUMNS),
            id_columns: to_owned(ID_COLUMNS),
            free_text_columns: vec![FREE_TEXT_COLUMN.to_string()],
        }
    }

    pub fn with_schema(mut self, schema: ColumnSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_date_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.date_columns = to_owned(columns);
        self
    }

    pub fn with_id_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.id_columns = to_owned(columns);
        self
    }

    pub fn with_free_text_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.free_text_columns = to_owned(columns);
        self
    }

    pub fn is_date_column(&self, name: &str) -> bool {
        self.date_columns.iter().any(|c| c == name)
    }

    pub fn is_id_column(&self, name: &str) -> bool {
        self.id_columns.iter().any(|c| c == name)
    }

    pub fn is_free_text_column(&self, name: &str) -> bool {
        self.free_text_columns.iter().any(|c| c == name)
    }
}

impl Default for NormalizationRules {
    fn default() -> Self {
        Self::backlog()
    }
}

fn to_owned<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backlog_rules() {
        let rules = NormalizationRules::backlog();
        assert!(rules.is_date_column("criacao_do_ntt"));
        assert!(rules.is_id_column("id_4field"));
        assert!(rules.is_free_text_column("priorizacao_dispatching"));
        assert!(!rules.is_date_column("Criação do NTT"));
    }

    #[test]
    fn test_builder_overrides_lists() {
        let rules = NormalizationRules::backlog()
            .with_date_columns(&["opened"])
            .with_id_columns::<&str>(&[]);
        assert!(rules.is_date_column("opened"));
        assert!(!rules.is_date_column("criacao_do_ntt"));
        assert!(rules.id_columns.is_empty());
    }
}
