//! Property tests for cell-level normalization.

use fieldsync_normalization::values::{CanonicalId, canonical_id, normalize_datetime};
use fieldsync_normalization::{Normalizer, NormalizationRules};
use polars::prelude::{AnyValue, Column, DataFrame};
use proptest::prelude::*;

fn is_digit_string(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_iso_datetime(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

fn id_input() -> impl Strategy<Value = AnyValue<'static>> {
    prop_oneof![
        Just(AnyValue::Null),
        (0i64..i64::MAX).prop_map(AnyValue::Int64),
        (0u32..=u32::MAX).prop_map(|v| AnyValue::Float64(f64::from(v))),
        Just(AnyValue::Float64(f64::NAN)),
        "[0-9]{1,18}".prop_map(|s| AnyValue::StringOwned(s.into())),
        (0u32..1_000_000).prop_map(|v| AnyValue::StringOwned(format!("{v}.0").into())),
        prop::sample::select(vec!["", "nan", "None", "NaT"])
            .prop_map(|s| AnyValue::StringOwned(s.into())),
    ]
}

fn text_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    let column = df.column(name).unwrap();
    (0..column.len())
        .map(|idx| match column.get(idx).unwrap() {
            AnyValue::Null => None,
            AnyValue::String(s) => Some(s.to_string()),
            AnyValue::StringOwned(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        })
        .collect()
}

proptest! {
    /// Property: supported id inputs become digit strings or null, never "0".
    #[test]
    fn prop_id_is_digits_or_null(value in id_input()) {
        match canonical_id(&value) {
            CanonicalId::Id(id) => {
                prop_assert!(is_digit_string(&id), "not digits: {id}");
                prop_assert!(!id.bytes().all(|b| b == b'0'));
                prop_assert!(!id.contains('e') && !id.contains('E'));
            }
            CanonicalId::Missing => {}
            CanonicalId::Unsupported => prop_assert!(false, "unsupported: {value:?}"),
        }
    }

    /// Property: locale date-times become canonical ISO text.
    #[test]
    fn prop_locale_dates_become_iso(
        day in 1u32..=28,
        month in 1u32..=12,
        year in 1000i32..=9999,
        hour in 0u32..24,
        minute in 0u32..60,
        second in 0u32..60,
    ) {
        let raw = format!("{day:02}/{month:02}/{year:04} {hour:02}:{minute:02}:{second:02}");
        let normalized = normalize_datetime(&raw).unwrap();
        prop_assert!(is_iso_datetime(&normalized), "bad shape: {normalized}");
        prop_assert_eq!(
            normalized,
            format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
        );
    }

    /// Property: any text in a date column ends up ISO or null.
    #[test]
    fn prop_date_output_is_iso_or_null(raw in ".{0,24}") {
        if let Some(normalized) = normalize_datetime(&raw) {
            prop_assert!(is_iso_datetime(&normalized), "bad shape: {normalized}");
        }
    }

    /// Property: sentinels vanish and a second pass changes nothing.
    #[test]
    fn prop_sentinels_null_and_idempotent(
        cells in prop::collection::vec(
            prop_oneof![
                prop::sample::select(vec!["", "nan", "None", "NaT"]).prop_map(Some),
                Just(None::<&'static str>),
                prop::sample::select(vec!["Aberto", "Fechado", "SP"]).prop_map(Some),
            ],
            1..20,
        )
    ) {
        let df = DataFrame::new(vec![Column::new("Estado".into(), cells.clone())]).unwrap();
        let normalizer = Normalizer::new(NormalizationRules::backlog());

        let once = normalizer.normalize(df, None).unwrap().table;
        let values = text_values(&once, "estado");
        for (before, after) in cells.iter().zip(&values) {
            match before {
                Some(v) if ["", "nan", "None", "NaT"].contains(v) => prop_assert!(after.is_none()),
                Some(v) => prop_assert_eq!(after.as_deref(), Some(*v)),
                None => prop_assert!(after.is_none()),
            }
        }

        let twice = normalizer.normalize(once.clone(), None).unwrap().table;
        prop_assert!(once.equals_missing(&twice));
    }
}
