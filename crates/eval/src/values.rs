//! Value snapshots and the shared rules for comparing raw JSON values.

use std::collections::BTreeMap;

use formgate_schema::FormSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::numeric;

/// The complete set of field values at one instant, keyed by field id.
///
/// Snapshots are replaced wholesale on every change; [`with_value`]
/// returns a new snapshot rather than mutating the current one.
///
/// [`with_value`]: ValueSnapshot::with_value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueSnapshot(BTreeMap<String, Value>);

impl ValueSnapshot {
    pub fn new() -> Self {
        ValueSnapshot(BTreeMap::new())
    }

    /// Snapshot holding each field's initial value. Fields without a
    /// default are absent.
    pub fn from_defaults(schema: &FormSchema) -> Self {
        schema
            .fields()
            .filter_map(|f| f.initial_value().map(|v| (f.id.clone(), v)))
            .collect()
    }

    /// Build a snapshot from a JSON object. Returns `None` for any other
    /// JSON shape.
    pub fn from_json(value: &Value) -> Option<Self> {
        value
            .as_object()
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: Value) {
        self.0.insert(field_id.into(), value);
    }

    pub fn remove(&mut self, field_id: &str) -> Option<Value> {
        self.0.remove(field_id)
    }

    /// A copy of this snapshot with one value replaced.
    pub fn with_value(&self, field_id: &str, value: Value) -> Self {
        let mut next = self.clone();
        next.insert(field_id, value);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl From<BTreeMap<String, Value>> for ValueSnapshot {
    fn from(map: BTreeMap<String, Value>) -> Self {
        ValueSnapshot(map)
    }
}

impl FromIterator<(String, Value)> for ValueSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        ValueSnapshot(iter.into_iter().collect())
    }
}

/// Null, absent, a blank string or an empty list.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Loose equality between two raw values.
///
/// Identical JSON is equal. Otherwise numbers and numeric strings compare
/// by decimal value (`"2"` equals `2`), and booleans compare against the
/// strings `"true"` / `"false"`. Nothing else is equal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Number(_) | Value::String(_), Value::Number(_) | Value::String(_)) => {
            match (numeric::to_decimal(left), numeric::to_decimal(right)) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        _ => false,
    }
}

/// Text form of a scalar value, `None` for null, lists and objects.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&Value::Null)));
        assert!(is_empty_value(Some(&json!("   "))));
        assert!(is_empty_value(Some(&json!([]))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!({}))));
    }

    #[test]
    fn loose_equality() {
        assert!(values_equal(&json!("US"), &json!("US")));
        assert!(values_equal(&json!("2"), &json!(2)));
        assert!(values_equal(&json!(2.0), &json!(2)));
        assert!(values_equal(&json!(true), &json!("true")));
        assert!(values_equal(&json!("FALSE"), &json!(false)));
        assert!(!values_equal(&json!("US"), &json!("us")));
        assert!(!values_equal(&json!(""), &json!(0)));
        assert!(!values_equal(&json!(1), &json!(true)));
        assert!(!values_equal(&Value::Null, &json!("")));
    }

    #[test]
    fn with_value_leaves_original_untouched() {
        let original: ValueSnapshot = [("a".to_string(), json!(1))].into_iter().collect();
        let next = original.with_value("a", json!(2));
        assert_eq!(original.get("a"), Some(&json!(1)));
        assert_eq!(next.get("a"), Some(&json!(2)));
    }

    #[test]
    fn from_json_requires_object() {
        assert!(ValueSnapshot::from_json(&json!([1])).is_none());
        let snap = ValueSnapshot::from_json(&json!({ "x": "y" })).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.to_json(), json!({ "x": "y" }));
    }
}
