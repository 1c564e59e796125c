//! Submission payload assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::ValueSnapshot;

/// The data sent to the submission endpoint: exactly one key per visible
/// field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionPayload(BTreeMap<String, Value>);

impl SubmissionPayload {
    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
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

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

/// Project the snapshot onto `visible_ids`. A visible field with no stored
/// value is sent as an explicit `null`; values of fields outside the set
/// are never included.
pub fn build_payload<'a>(
    snapshot: &ValueSnapshot,
    visible_ids: impl IntoIterator<Item = &'a str>,
) -> SubmissionPayload {
    SubmissionPayload(
        visible_ids
            .into_iter()
            .map(|id| (id.to_string(), snapshot.get(id).cloned().unwrap_or(Value::Null)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_match_visible_set() {
        let snapshot = ValueSnapshot::from_json(&json!({
            "country": "CA",
            "state": "BC",
            "name": "Ada"
        }))
        .unwrap();
        let payload = build_payload(&snapshot, ["country", "name", "email"]);
        assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["country", "email", "name"]);
        assert_eq!(payload.get("email"), Some(&Value::Null));
        assert!(!payload.contains("state"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let snapshot = ValueSnapshot::from_json(&json!({ "a": 1 })).unwrap();
        let payload = build_payload(&snapshot, ["a"]);
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({ "a": 1 }));
        assert_eq!(payload.to_json(), json!({ "a": 1 }));
    }

    #[test]
    fn empty_visible_set() {
        let snapshot = ValueSnapshot::from_json(&json!({ "a": 1 })).unwrap();
        assert!(build_payload(&snapshot, std::iter::empty()).is_empty());
    }
}
