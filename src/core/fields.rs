//! Per-instance widget values.
//!
//! A [`FieldStore`] holds the values a node persists as part of the saved
//! workflow and that the pipeline reads back when it resumes. The host's
//! persistence format only knows scalar widget values, so everything is kept
//! as a [`NodeValue`] and read back through tolerant accessors: a value that is
//! missing or has the wrong shape reads as the nearest safe default instead of
//! failing.

use serde::{Deserialize, Serialize};

use crate::core::NodeValue;

/// Field holding the "operator pressed continue" flag.
pub const READY: &str = "ready";
/// Field holding the per-instance gating switch.
pub const BLOCKING: &str = "blocking";
/// Older workflows saved the gating switch under this name.
pub const LEGACY_BLOCK: &str = "block";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldStore {
    values: serde_json::Map<String, NodeValue>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&NodeValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<NodeValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Sets the field only if it is not present yet.
    pub fn set_default(&mut self, name: &str, value: impl Into<NodeValue>) {
        if !self.contains(name) {
            self.set(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<NodeValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeValue)> {
        self.values.iter()
    }

    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(NodeValue::as_bool).unwrap_or(default)
    }

    /// The gating switch, falling back to the legacy field name, `true` when absent.
    pub fn blocking(&self) -> bool {
        self.get(BLOCKING)
            .or_else(|| self.get(LEGACY_BLOCK))
            .and_then(NodeValue::as_bool)
            .unwrap_or(true)
    }

    pub fn ready(&self) -> bool {
        self.flag(READY, false)
    }

    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(NodeValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Reads a non-negative integer. Negative numbers read as 0, numeric strings are accepted.
    pub fn index(&self, name: &str) -> usize {
        match self.get(name) {
            Some(NodeValue::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                .unwrap_or(0) as usize,
            Some(NodeValue::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn texts(&self, name: &str) -> Vec<String> {
        parse_texts(self.get(name))
    }

    /// Stores `texts` as a typed array.
    pub fn set_texts(&mut self, name: &str, texts: &[String]) {
        self.set(
            name,
            NodeValue::Array(texts.iter().cloned().map(NodeValue::String).collect()),
        );
    }
}

/// Reads an ordered text collection.
///
/// Accepts a JSON array, or a string holding a serialized JSON array (the
/// format older workflows persisted). Anything else, including a string that
/// does not parse, reads as an empty sequence. Array elements that are not
/// strings read as `""`.
pub fn parse_texts(value: Option<&NodeValue>) -> Vec<String> {
    match value {
        None | Some(NodeValue::Null) => Vec::new(),
        Some(NodeValue::Array(items)) => items
            .iter()
            .map(|item| item.as_str().unwrap_or_default().to_string())
            .collect(),
        Some(NodeValue::String(raw)) if raw.trim().is_empty() => Vec::new(),
        Some(NodeValue::String(raw)) => match serde_json::from_str::<NodeValue>(raw) {
            Ok(parsed @ NodeValue::Array(_)) => parse_texts(Some(&parsed)),
            Ok(_) | Err(_) => {
                log::warn!("Persisted text collection is not a JSON array, treating it as empty");
                Vec::new()
            }
        },
        Some(other) => {
            log::warn!(
                "Persisted text collection has unexpected type ({}), treating it as empty",
                other
            );
            Vec::new()
        }
    }
}

/// Grows `texts` with empty strings until it holds at least `len` slots.
pub fn pad_texts(texts: &mut Vec<String>, len: usize) {
    if texts.len() < len {
        texts.resize(len, String::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_read_as_defaults() {
        let fields = FieldStore::new();
        assert_eq!(fields.text("text"), "");
        assert_eq!(fields.index("current_index"), 0);
        assert!(fields.texts("all_texts").is_empty());
        assert!(!fields.ready());
        assert!(fields.blocking());
    }

    #[test]
    fn test_blocking_falls_back_to_legacy_name() {
        let mut fields = FieldStore::new();
        fields.set(LEGACY_BLOCK, false);
        assert!(!fields.blocking());

        fields.set(BLOCKING, true);
        assert!(fields.blocking());
    }

    #[test]
    fn test_index_tolerates_odd_shapes() {
        let mut fields = FieldStore::new();
        fields.set("i", -4);
        assert_eq!(fields.index("i"), 0);
        fields.set("i", "3");
        assert_eq!(fields.index("i"), 3);
        fields.set("i", 2.0);
        assert_eq!(fields.index("i"), 2);
        fields.set("i", json!({"nope": 1}));
        assert_eq!(fields.index("i"), 0);
    }

    #[test]
    fn test_texts_accepts_typed_and_legacy_arrays() {
        let mut fields = FieldStore::new();
        fields.set("typed", json!(["a", "b"]));
        fields.set("legacy", r#"["c", "", "d"]"#);
        assert_eq!(fields.texts("typed"), vec!["a", "b"]);
        assert_eq!(fields.texts("legacy"), vec!["c", "", "d"]);
    }

    #[test]
    fn test_malformed_texts_read_as_empty() {
        let mut fields = FieldStore::new();
        fields.set("broken", "[\"a\", ");
        fields.set("object", r#"{"0": "a"}"#);
        fields.set("number", 12);
        fields.set("blank", "   ");
        assert!(fields.texts("broken").is_empty());
        assert!(fields.texts("object").is_empty());
        assert!(fields.texts("number").is_empty());
        assert!(fields.texts("blank").is_empty());
    }

    #[test]
    fn test_non_string_elements_read_as_empty_slots() {
        let texts = parse_texts(Some(&json!(["a", null, 3, "d"])));
        assert_eq!(texts, vec!["a", "", "", "d"]);
    }

    #[test]
    fn test_pad_only_grows() {
        let mut texts = vec!["a".to_string()];
        pad_texts(&mut texts, 3);
        assert_eq!(texts, vec!["a", "", ""]);
        pad_texts(&mut texts, 1);
        assert_eq!(texts.len(), 3);
    }

    #[test]
    fn test_set_default_keeps_existing_value() {
        let mut fields = FieldStore::new();
        fields.set("text", "kept");
        fields.set_default("text", "");
        fields.set_default("ready", false);
        assert_eq!(fields.text("text"), "kept");
        assert_eq!(fields.get("ready"), Some(&json!(false)));
    }

    #[test]
    fn test_store_serializes_as_plain_object() {
        let mut fields = FieldStore::new();
        fields.set("text", "hello");
        fields.set_texts("all_texts", &["x".to_string()]);
        assert_eq!(
            serde_json::to_value(&fields).unwrap(),
            json!({"text": "hello", "all_texts": ["x"]})
        );
    }
}
