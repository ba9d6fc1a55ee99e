//! Tag set normalization
//!
//! Tag ids arrive loosely typed from request bodies. They feed the issuance
//! fingerprint, so the same logical set must always produce the same ordered
//! sequence: non-empty strings only, deduplicated by exact value, sorted by
//! byte order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Deduplicated, byte-ordered sequence of non-empty tag ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Empty tag set
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build from typed ids, applying the same rules as [`normalize_tag_ids`]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = ids
            .into_iter()
            .filter(|id| !id.as_ref().trim().is_empty())
            .map(|id| id.as_ref().to_string())
            .collect();
        Self(set.into_iter().collect())
    }

    /// Tag ids in canonical order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate tag ids in canonical order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON array form, suitable for feeding back into [`normalize_tag_ids`]
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

/// Canonicalize an arbitrary JSON value into a [`TagSet`].
///
/// Anything that is not an array yields the empty set. Non-string elements
/// and strings that are blank after trimming are dropped; the kept strings
/// are not themselves trimmed.
pub fn normalize_tag_ids(value: &Value) -> TagSet {
    match value {
        Value::Array(items) => TagSet::from_ids(items.iter().filter_map(Value::as_str)),
        _ => TagSet::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_filters_dedups_and_sorts() {
        let result = normalize_tag_ids(&json!(["beta", "", "alpha", "beta", "  ", null, 42]));
        assert_eq!(result.as_slice(), ["alpha", "beta"]);
    }

    #[test]
    fn test_non_array_yields_empty() {
        assert!(normalize_tag_ids(&json!("not-an-array")).is_empty());
        assert!(normalize_tag_ids(&json!({"alpha": true})).is_empty());
        assert!(normalize_tag_ids(&Value::Null).is_empty());
    }

    #[test]
    fn test_byte_order_not_locale_order() {
        let result = normalize_tag_ids(&json!(["b", "B", "a", "Z"]));
        assert_eq!(result.as_slice(), ["B", "Z", "a", "b"]);
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        let result = normalize_tag_ids(&json!([" alpha", "alpha"]));
        assert_eq!(result.as_slice(), [" alpha", "alpha"]);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[ a-c]{0,3}".prop_map(Value::String),
        ]
        .boxed();
        prop_oneof![
            leaf.clone(),
            prop::collection::vec(leaf, 0..12).prop_map(Value::Array),
        ]
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(input in arb_json()) {
            let once = normalize_tag_ids(&input);
            let twice = normalize_tag_ids(&once.to_value());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalization_ignores_input_order(mut ids in prop::collection::vec("[a-d]{1,2}", 0..8)) {
            let forward = TagSet::from_ids(&ids);
            ids.reverse();
            prop_assert_eq!(forward, TagSet::from_ids(&ids));
        }
    }
}
