//! Canonical form for structured values
//!
//! A structured value is a `serde_json::Value`: scalars, ordered lists, and
//! string-keyed mappings. The workspace enables `serde_json/preserve_order`,
//! so mappings remember insertion order and two deeply equal values may
//! iterate differently. [`canonicalize`] removes that difference by sorting
//! mapping keys (code-point order, recursively); list order is never touched.

use serde::Serialize;
use serde_json::{Map, Value};

/// Recursively sort mapping keys ascending by code point
///
/// Pure and idempotent: `canonicalize(&canonicalize(v)) == canonicalize(v)`.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, item) in entries {
                sorted.insert(key.clone(), canonicalize(item));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

/// Render a value as two-space indented JSON
///
/// Deterministic for a given value; combine with [`canonicalize`] (or use
/// [`canonical_string`]) to make the output independent of key order.
///
/// # Errors
/// Returns error if the value cannot be rendered
pub fn serialize(value: &Value) -> Result<String, CanonicalError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// `serialize(canonicalize(value))`
///
/// # Errors
/// Returns error if the value cannot be rendered
pub fn canonical_string(value: &Value) -> Result<String, CanonicalError> {
    serialize(&canonicalize(value))
}

/// Convert any serializable type into its canonical structured value
///
/// # Errors
/// Returns error if `T` cannot be represented as a structured value
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<Value, CanonicalError> {
    let value = serde_json::to_value(value)?;
    Ok(canonicalize(&value))
}

/// Canonical serialization errors
#[derive(Debug, thiserror::Error)]
pub enum CanonicalError {
    /// Value could not be converted or rendered
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sorts_nested_mapping_keys() {
        let value: Value =
            serde_json::from_str(r#"{"plan": {"z": 1, "a": 2}, "meta": {"case_number": null}}"#)
                .unwrap();
        let canonical = canonicalize(&value);

        let top: Vec<&String> = canonical.as_object().unwrap().keys().collect();
        assert_eq!(top, ["meta", "plan"]);
        let plan: Vec<&String> = canonical["plan"].as_object().unwrap().keys().collect();
        assert_eq!(plan, ["a", "z"]);
    }

    #[test]
    fn keeps_list_order_and_sorts_inside_elements() {
        let value: Value = serde_json::from_str(r#"[{"b": 1, "a": 2}, 3, "x"]"#).unwrap();
        let text = canonical_string(&value).unwrap();
        assert_eq!(
            text,
            "[\n  {\n    \"a\": 2,\n    \"b\": 1\n  },\n  3,\n  \"x\"\n]"
        );
    }

    #[test]
    fn code_point_order_puts_uppercase_first() {
        let value: Value = serde_json::from_str(r#"{"b": 1, "B": 2, "a": 3, "é": 4}"#).unwrap();
        let canonical = canonicalize(&value);
        let keys: Vec<&String> = canonical.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["B", "a", "b", "é"]);
    }

    #[test]
    fn empty_containers_and_scalars_are_total() {
        for value in [json!({}), json!([]), json!(null), json!("s"), json!(1.5)] {
            assert_eq!(canonicalize(&value), value);
            assert!(canonical_string(&value).is_ok());
        }
    }

    #[test]
    fn typed_values_canonicalize() {
        #[derive(Serialize)]
        struct Entry {
            zeta: u8,
            alpha: &'static str,
        }

        let value = to_canonical_value(&Entry { zeta: 1, alpha: "a" }).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }
}
