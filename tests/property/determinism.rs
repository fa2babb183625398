//! Property-based tests for determinism guarantees

use proptest::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use universal_agent::hash::{canonical_hash, canonical_hash_subset};
use universal_agent::transform::ResourceTransformer;
use universal_agent::types::AttributeMap;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn attribute_map() -> impl Strategy<Value = AttributeMap> {
    prop::collection::btree_map("[a-z_]{1,8}", json_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

/// Test that hashing ignores map iteration order
#[test]
fn test_hash_ignores_key_order_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec(("[a-z]{1,8}", any::<i64>()), 0..16),
            |entries| {
                let ordered: BTreeMap<String, i64> = entries.iter().cloned().collect();
                let unordered: HashMap<String, i64> = entries.iter().rev().cloned().collect();
                // Duplicate keys would keep different values in the two maps
                prop_assume!(ordered.len() == entries.len());

                assert_eq!(
                    canonical_hash(&ordered).unwrap(),
                    canonical_hash(&unordered).unwrap()
                );
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    #[test]
    fn test_hash_is_deterministic(view in attribute_map()) {
        prop_assert_eq!(canonical_hash(&view).unwrap(), canonical_hash(&view.clone()).unwrap());
    }

    #[test]
    fn test_different_content_different_hash(a in attribute_map(), b in attribute_map()) {
        prop_assume!(a != b);
        prop_assert_ne!(canonical_hash(&a).unwrap(), canonical_hash(&b).unwrap());
    }

    #[test]
    fn test_subset_hash_ignores_other_fields(
        view in attribute_map(),
        extra in "[A-Z]{1,6}",
        value in json_value(),
    ) {
        let fields: BTreeSet<String> = view.keys().cloned().collect();
        let mut widened = view.clone();
        // Upper-case keys never collide with the generated lower-case ones
        widened.insert(extra, value);

        prop_assert_eq!(
            canonical_hash_subset(&view, &fields).unwrap(),
            canonical_hash_subset(&widened, &fields).unwrap()
        );
        prop_assert_eq!(
            canonical_hash_subset(&view, &fields).unwrap(),
            canonical_hash(&view).unwrap()
        );
    }

    #[test]
    fn test_disabled_transformer_is_identity(
        view in attribute_map(),
        attributes in prop::option::of(prop::collection::btree_set("[a-z_]{1,8}", 0..4)),
    ) {
        let transformer = ResourceTransformer {
            ignore_null_attributes: false,
            attributes,
        };
        prop_assert_eq!(transformer.transform(view.clone()), view);
    }

    #[test]
    fn test_ignore_nulls_only_drops_nulls(view in attribute_map()) {
        let out = ResourceTransformer::ignore_nulls().transform(view.clone());
        prop_assert!(out.values().all(|v| !v.is_null()));
        let kept = view.iter().filter(|(_, v)| !v.is_null()).count();
        prop_assert_eq!(out.len(), kept);
    }
}
