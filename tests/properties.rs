//! Property tests for validation, normalization and store round trips.

use proptest::prelude::*;
use recordbook::validation::{normalize_value, Validator};
use recordbook::{RecordFilter, RecordInput, SortField, SortOrder, Store};
use serde_json::{json, Value};

fn category() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]([A-Za-z0-9 ]{0,48}[A-Za-z0-9])?"
}

fn entries() -> impl Strategy<Value = Vec<(String, u32, String)>> {
    prop::collection::vec((category(), 0u32..=999_999, "[a-z ]{0,20}"), 0..12)
}

fn fresh_store() -> Store {
    let store = Store::in_memory();
    store.initialize().unwrap();
    store
}

proptest! {
    #[test]
    fn prop_unpadded_categories_are_valid(name in category()) {
        let validator = Validator::default();
        prop_assert!(validator.validate_category(&json!(name)));
    }

    #[test]
    fn prop_padded_categories_are_invalid(name in category(), pad in "[ \t]{1,3}") {
        let validator = Validator::default();
        let leading = format!("{pad}{name}");
        let trailing = format!("{name}{pad}");
        prop_assert!(!validator.validate_category(&json!(leading)));
        prop_assert!(!validator.validate_category(&json!(trailing)));
    }

    #[test]
    fn prop_long_categories_are_invalid(name in "[a-z]{51,80}") {
        prop_assert!(!Validator::default().validate_category(&json!(name)));
    }

    #[test]
    fn prop_value_range(v in -2_000_000i64..2_000_000) {
        let valid = Validator::default().validate_value(&json!(v));
        prop_assert_eq!(valid, (0..=999_999).contains(&v));
    }

    #[test]
    fn prop_normalize_value_floors(v in 0.0f64..999_999.0) {
        prop_assert_eq!(normalize_value(&json!(v)), v.floor() as u32);
    }

    #[test]
    fn prop_normalize_value_clamps_negatives(v in -1_000_000.0f64..0.0) {
        prop_assert_eq!(normalize_value(&json!(v)), 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_export_import_roundtrip(entries in entries()) {
        let source = fresh_store();
        for (category, value, memo) in &entries {
            source
                .add_record(RecordInput::new(category.as_str(), *value).with_memo(memo.as_str()))
                .unwrap();
        }

        let target = fresh_store();
        target.import_data(&source.export_data().unwrap()).unwrap();

        let all = RecordFilter::new();
        prop_assert_eq!(target.get_records(&all), source.get_records(&all));
        prop_assert_eq!(target.get_categories(), source.get_categories());
        prop_assert_eq!(target.get_settings(), source.get_settings());
    }

    #[test]
    fn prop_sort_by_value(entries in entries(), descending in any::<bool>()) {
        let store = fresh_store();
        for (category, value, _) in &entries {
            store.add_record(RecordInput::new(category.as_str(), *value)).unwrap();
        }

        let order = if descending { SortOrder::Desc } else { SortOrder::Asc };
        let values: Vec<u32> = store
            .get_records(&RecordFilter::new().sort_by(SortField::Value, order))
            .iter()
            .map(|r| r.value)
            .collect();

        prop_assert_eq!(values.len(), entries.len());
        for pair in values.windows(2) {
            if descending {
                prop_assert!(pair[0] >= pair[1]);
            } else {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn prop_search_matches_category_or_memo(entries in entries(), term in "[a-z]{1,2}") {
        let store = fresh_store();
        for (category, value, memo) in &entries {
            store
                .add_record(RecordInput::new(category.as_str(), *value).with_memo(memo.as_str()))
                .unwrap();
        }

        let found = store.get_records(&RecordFilter::new().search(term.to_uppercase()));
        let expected = entries
            .iter()
            .filter(|(category, _, memo)| {
                category.to_lowercase().contains(&term) || memo.trim().contains(&term)
            })
            .count();
        prop_assert_eq!(found.len(), expected);
    }

    #[test]
    fn prop_rejected_input_changes_nothing(name in "[ \t]{0,5}", value in any::<i64>()) {
        let store = fresh_store();
        let before: Value = serde_json::from_str(&store.export_data().unwrap()).unwrap();

        prop_assert!(store.add_record(RecordInput::new(name.as_str(), value)).is_err());

        let after: Value = serde_json::from_str(&store.export_data().unwrap()).unwrap();
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_repair_is_idempotent(drop_mask in 0u8..16) {
        let store = fresh_store();
        let mut doc: Value = serde_json::from_str(&store.export_data().unwrap()).unwrap();
        for (bit, section) in ["settings", "data", "backup", "metadata"].iter().enumerate() {
            if drop_mask & (1 << bit) != 0 {
                doc.as_object_mut().unwrap().remove(*section);
            }
        }
        store.backend().set(&store.keys().document, &doc.to_string()).unwrap();

        prop_assert_eq!(store.repair_data().unwrap(), drop_mask != 0);
        let stamped = store.get_data().metadata.last_update;
        prop_assert!(!store.repair_data().unwrap());
        prop_assert_eq!(store.get_data().metadata.last_update, stamped);
    }
}
