//! Structured log documents with dotted-path field access.
//!
//! A [`Document`] is built once from a `serde_json::Value` and never mutated.
//! Nested objects flatten into dotted paths (`{"process": {"name": ...}}`
//! becomes `process.name`); a literal dotted key (`"process.name"` as a flat
//! key) lands on the same path. Arrays keep one stored value per element
//! under the same path, which gives multi-valued fields OR semantics at match
//! time.

use std::collections::BTreeMap;

use serde_json::Value;

/// A single stored field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Render the value back as JSON for traces and reports.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Null => Value::Null,
        }
    }
}

/// An immutable, flattened log document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: BTreeMap<String, Vec<FieldValue>>,
}

impl Document {
    /// Flatten a JSON value into a document.
    ///
    /// Non-object roots produce an empty document: a bare scalar has no
    /// field paths to address.
    pub fn from_json(value: &Value) -> Self {
        let mut fields = BTreeMap::new();
        if let Value::Object(map) = value {
            for (key, val) in map {
                flatten(key, val, &mut fields);
            }
        }
        Document { fields }
    }

    /// All stored values under a dotted path, empty when the field is absent.
    pub fn values(&self, path: &str) -> &[FieldValue] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the path holds at least one non-null value.
    pub fn contains(&self, path: &str) -> bool {
        self.values(path)
            .iter()
            .any(|v| !matches!(v, FieldValue::Null))
    }

    /// Every field path in the document, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn flatten(path: &str, value: &Value, out: &mut BTreeMap<String, Vec<FieldValue>>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten(&format!("{path}.{key}"), val, out);
            }
        }
        Value::Array(items) => {
            // Each element lands under the same path
            for item in items {
                flatten(path, item, out);
            }
        }
        Value::String(s) => push(path, FieldValue::String(s.clone()), out),
        Value::Number(n) => {
            let v = n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null);
            push(path, v, out);
        }
        Value::Bool(b) => push(path, FieldValue::Bool(*b), out),
        Value::Null => push(path, FieldValue::Null, out),
    }
}

fn push(path: &str, value: FieldValue, out: &mut BTreeMap<String, Vec<FieldValue>>) {
    out.entry(path.to_string()).or_default().push(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_object_flattens_to_dotted_path() {
        let doc = Document::from_json(&json!({
            "process": {"name": "vssadmin.exe", "pid": 4812}
        }));
        assert_eq!(
            doc.values("process.name"),
            &[FieldValue::String("vssadmin.exe".to_string())]
        );
        assert_eq!(doc.values("process.pid"), &[FieldValue::Number(4812.0)]);
    }

    #[test]
    fn flat_dotted_key_lands_on_same_path() {
        let nested = Document::from_json(&json!({"event": {"code": "1"}}));
        let flat = Document::from_json(&json!({"event.code": "1"}));
        assert_eq!(nested.values("event.code"), flat.values("event.code"));
    }

    #[test]
    fn array_values_share_one_path() {
        let doc = Document::from_json(&json!({
            "process": {"args": ["delete", "shadows", "/all"]}
        }));
        assert_eq!(doc.values("process.args").len(), 3);
    }

    #[test]
    fn absent_field_is_empty_slice() {
        let doc = Document::from_json(&json!({"a": 1}));
        assert!(doc.values("missing.path").is_empty());
        assert!(!doc.contains("missing.path"));
    }

    #[test]
    fn null_does_not_count_as_present() {
        let doc = Document::from_json(&json!({"user": {"domain": null}}));
        assert!(!doc.contains("user.domain"));
        assert_eq!(doc.values("user.domain"), &[FieldValue::Null]);
    }

    #[test]
    fn non_object_root_is_empty() {
        assert!(Document::from_json(&json!("just a string")).is_empty());
        assert!(Document::from_json(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn objects_inside_arrays_flatten() {
        let doc = Document::from_json(&json!({
            "related": [{"user": "alice"}, {"user": "bob"}]
        }));
        assert_eq!(
            doc.values("related.user"),
            &[
                FieldValue::String("alice".to_string()),
                FieldValue::String("bob".to_string()),
            ]
        );
    }
}
