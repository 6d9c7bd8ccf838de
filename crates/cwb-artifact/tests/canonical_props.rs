//! Canonical form properties over generated values

use cwb_artifact::{canonical_string, canonicalize, ContentHash};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 %.-]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-zA-Z_]{1,6}", inner), 0..6).prop_map(|entries| {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key, value);
                }
                Value::Object(map)
            }),
        ]
    })
}

/// Same value, every mapping rebuilt in reverse insertion order
fn reverse_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut reversed = Map::new();
            for (key, item) in map.iter().rev() {
                reversed.insert(key.clone(), reverse_keys(item));
            }
            Value::Object(reversed)
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_keys).collect()),
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn prop_canonicalize_is_idempotent(value in arb_value()) {
        let once = canonicalize(&value);
        let twice = canonicalize(&once);
        prop_assert_eq!(canonical_string(&once).unwrap(), canonical_string(&twice).unwrap());
    }

    #[test]
    fn prop_key_order_never_reaches_serialization(value in arb_value()) {
        let reordered = reverse_keys(&value);
        prop_assert_eq!(
            canonical_string(&value).unwrap(),
            canonical_string(&reordered).unwrap()
        );
        prop_assert_eq!(
            ContentHash::of_canonical(&value).unwrap(),
            ContentHash::of_canonical(&reordered).unwrap()
        );
    }

    #[test]
    fn prop_canonicalize_preserves_content(value in arb_value()) {
        prop_assert_eq!(canonicalize(&value), value);
    }
}
