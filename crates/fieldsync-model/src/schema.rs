//! Fixed raw-header → canonical-name dictionary.

use std::collections::BTreeMap;

/// Version of the built-in backlog dictionary.
///
/// Bump when an entry is added, removed or renamed so downstream tables can
/// tell which vocabulary produced them.
pub const BACKLOG_SCHEMA_VERSION: u32 = 1;

const BACKLOG_COLUMNS: &[(&str, &str)] = &[
    ("Id 4Field", "id_4field"),
    ("Criação do NTT", "criacao_do_ntt"),
    ("Tempo de Abertura", "tempo_de_abertura"),
    ("Data", "data"),
    (
        "Hora de criação da atividade (aux)",
        "hora_de_criacao_da_atividade_aux",
    ),
    ("ID da Atividade", "id_da_atividade"),
    ("Número de Ordem", "numero_de_ordem"),
    ("Evento", "evento"),
    ("Tipo da Atividade", "tipo_da_atividade"),
    ("Estado", "estado"),
    ("Provedor", "provedor"),
    ("Matrícula do Provedor", "matricula_do_provedor"),
    ("Tipo Contrato", "tipo_contrato"),
    ("Regional", "regional"),
    ("Contrato", "contrato"),
    ("Empresa", "empresa"),
    ("UF", "uf"),
    ("Cidade", "cidade"),
    ("Usuário Executor", "usuario_executor"),
    ("ETA", "eta"),
    ("Fim", "fim"),
    ("Título do Alarme", "titulo_do_alarme"),
    ("Tipo da Falha", "tipo_da_falha"),
    ("CM", "cm"),
    ("END_ID", "end_id"),
    ("NE ID", "ne_id"),
    ("Tipo de NE", "tipo_de_ne"),
    ("BSC/RNC", "bsc_rnc"),
    ("Motivo do Pendenciamento", "motivo_do_pendenciamento"),
    ("Operadora", "operadora"),
    ("Nota de Abertura", "nota_de_abertura"),
    ("Prioridade", "prioridade"),
    ("Responsabilidade", "responsabilidade"),
    ("Sub Área", "sub_area"),
    ("Motivo da Suspensão", "motivo_da_suspensao"),
    ("Motivo da Tramitação", "motivo_da_tramitacao"),
    ("Tramitação ou Suspensão", "tramitacao_ou_suspensao"),
    ("Repetido", "repetido"),
    ("Início GMG", "inicio_gmg"),
    ("Término GMG", "termino_gmg"),
    ("Status GMG", "status_gmg"),
    ("Responsável GMG", "responsavel_gmg"),
    ("Descrição GMG", "descricao_gmg"),
    ("Priorização Dispatching", "priorizacao_dispatching"),
    (
        "Priorização Dispatching Classific.",
        "priorizacao_dispatching_classific",
    ),
    ("Workzone", "workzone"),
    ("Workzone END_ID", "workzone_end_id"),
    ("Data Primeira Roteirização", "data_primeira_roteirizacao"),
    ("Data Última Roteirização", "data_ultima_roteirizacao"),
    ("Classificação GSBI", "classificacao_gsbi"),
    (
        "Seguimento de rede equipamento",
        "seguimento_de_rede_equipamento",
    ),
    ("Função do Equipamento", "funcao_do_equipamento"),
    ("Prédios Industriais", "predios_industriais"),
    ("Regra usuário criador", "regra_usuario_criador"),
    ("Grupo", "grupo"),
    ("ID do Ticket CA", "id_do_ticket_ca"),
    (
        "Qual foi a causa da falha no elemento?",
        "qual_foi_a_causa_da_falha_no_elemento",
    ),
    ("Onde está o problema?", "onde_esta_o_problema"),
    (
        "O que foi feito para resolver?",
        "o_que_foi_feito_para_resolver",
    ),
    ("Data da Coleta", "data_da_coleta"),
];

/// Mapping from raw export header to canonical column name.
///
/// Headers absent from the dictionary are passed through unchanged by
/// [`ColumnSchema::canonical_name`]. The dictionary is assumed injective;
/// two raw headers mapping to the same canonical name is a dictionary bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    version: u32,
    entries: BTreeMap<String, String>,
}

impl ColumnSchema {
    /// The built-in dictionary for the backlog export.
    pub fn backlog() -> Self {
        Self::from_pairs(BACKLOG_SCHEMA_VERSION, BACKLOG_COLUMNS.iter().copied())
    }

    /// Build a dictionary from `(raw, canonical)` pairs.
    pub fn from_pairs<'a>(version: u32, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
            .collect();
        Self { version, entries }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical name for a raw header, if the dictionary knows it.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    /// Canonical name for a raw header, or the header itself when unknown.
    pub fn canonical_name<'a>(&'a self, raw: &'a str) -> &'a str {
        self.lookup(raw).unwrap_or(raw)
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::backlog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_backlog_dictionary_is_injective() {
        let schema = ColumnSchema::backlog();
        let canonical: BTreeSet<&str> = BACKLOG_COLUMNS.iter().map(|(_, c)| *c).collect();
        assert_eq!(canonical.len(), BACKLOG_COLUMNS.len());
        assert_eq!(schema.len(), BACKLOG_COLUMNS.len());
    }

    #[test]
    fn test_canonical_name_passes_unknown_through() {
        let schema = ColumnSchema::backlog();
        assert_eq!(schema.canonical_name("Id 4Field"), "id_4field");
        assert_eq!(schema.canonical_name("Criação do NTT"), "criacao_do_ntt");
        assert_eq!(schema.canonical_name("Coluna Nova"), "Coluna Nova");
    }

    #[test]
    fn test_canonical_names_are_snake_case() {
        for (_, canonical) in BACKLOG_COLUMNS {
            assert!(
                canonical
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_'),
                "{canonical} is not snake_case"
            );
        }
    }

    #[test]
    fn test_typed_columns_exist_in_dictionary() {
        let schema = ColumnSchema::backlog();
        let canonical: BTreeSet<&str> = BACKLOG_COLUMNS.iter().map(|(_, c)| *c).collect();
        for column in crate::DATE_COLUMNS.iter().chain(crate::ID_COLUMNS) {
            assert!(canonical.contains(column), "{column} missing");
        }
        assert!(canonical.contains(crate::FREE_TEXT_COLUMN));
        assert_eq!(schema.version(), BACKLOG_SCHEMA_VERSION);
    }
}
