//! Field state resolution.
//!
//! Computes visibility and required-ness for every field in a single pass
//! over the schema. Rule effects never feed other rules: a rule reads the
//! source field's stored value, not its resolved visibility, so a hidden
//! field's last value still participates exactly as stored.
//!
//! Per field:
//! 1. Start from `visible_default` / `required_default`.
//! 2. Group conditions by effect and combine each non-empty group with its
//!    combinator (the first rule's).
//! 3. A true `hide` group hides the field; otherwise a `show` group, when
//!    present, decides; otherwise the default stands. A true `require`
//!    group makes the field required; otherwise a true `optional` group
//!    makes it optional; otherwise the default stands.
//! 4. A field that is not visible is not required.

use std::collections::BTreeMap;

use formgate_schema::{Combinator, Effect, Field, FormSchema};
use serde::Serialize;
use tracing::trace;

use crate::condition::evaluate;
use crate::values::ValueSnapshot;

/// Derived visibility and required flags for every field in a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub visibility: BTreeMap<String, bool>,
    pub required: BTreeMap<String, bool>,
    /// Field ids in schema order.
    #[serde(skip)]
    order: Vec<String>,
}

impl FieldState {
    fn with_capacity(n: usize) -> Self {
        FieldState {
            visibility: BTreeMap::new(),
            required: BTreeMap::new(),
            order: Vec::with_capacity(n),
        }
    }

    fn insert(&mut self, field_id: &str, visible: bool, required: bool) {
        self.visibility.insert(field_id.to_string(), visible);
        self.required.insert(field_id.to_string(), required);
        self.order.push(field_id.to_string());
    }

    /// Unknown field ids are not visible.
    pub fn is_visible(&self, field_id: &str) -> bool {
        self.visibility.get(field_id).copied().unwrap_or(false)
    }

    pub fn is_required(&self, field_id: &str) -> bool {
        self.required.get(field_id).copied().unwrap_or(false)
    }

    /// Visible field ids in schema order.
    pub fn visible_field_ids(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.is_visible(id))
            .map(String::as_str)
            .collect()
    }

    /// Hidden field ids in schema order.
    pub fn hidden_field_ids(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| !self.is_visible(id))
            .map(String::as_str)
            .collect()
    }

    /// Fields visible in `previous` that are hidden now.
    pub fn newly_hidden<'a>(&'a self, previous: &FieldState) -> Vec<&'a str> {
        self.order
            .iter()
            .filter(|id| previous.is_visible(id) && !self.is_visible(id))
            .map(String::as_str)
            .collect()
    }
}

/// Resolve the full field state for a schema and value snapshot.
///
/// Pure: the same inputs always give the same state, and nothing from an
/// earlier resolution is carried over.
pub fn resolve(schema: &FormSchema, snapshot: &ValueSnapshot) -> FieldState {
    let mut state = FieldState::with_capacity(schema.field_count());
    for field in schema.fields() {
        let (visible, required) = resolve_field(field, snapshot);
        state.insert(&field.id, visible, required);
    }
    trace!(
        fields = state.order.len(),
        visible = state.visibility.values().filter(|v| **v).count(),
        "resolved field state"
    );
    state
}

/// Resolve one field, returning `(visible, required)`.
pub fn resolve_field(field: &Field, snapshot: &ValueSnapshot) -> (bool, bool) {
    let hide = eval_group(field, Effect::Hide, snapshot);
    let show = eval_group(field, Effect::Show, snapshot);
    let require = eval_group(field, Effect::Require, snapshot);
    let optional = eval_group(field, Effect::Optional, snapshot);

    let visible = if hide == Some(true) {
        false
    } else {
        show.unwrap_or(field.visible_default)
    };

    let required = if require == Some(true) {
        true
    } else if optional == Some(true) {
        false
    } else {
        field.required_default
    };

    (visible, visible && required)
}

/// Combined result of the field's rules for one effect, `None` when the
/// field has no rules for it.
fn eval_group(field: &Field, effect: Effect, snapshot: &ValueSnapshot) -> Option<bool> {
    let mut rules = field
        .conditions
        .iter()
        .filter(|r| r.target_effect == effect)
        .peekable();
    let combinator = rules.peek()?.combinator;
    Some(match combinator {
        Combinator::All => rules.all(|r| evaluate(r, snapshot)),
        Combinator::Any => rules.any(|r| evaluate(r, snapshot)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: serde_json::Value) -> FormSchema {
        FormSchema::from_json(&json!({ "sections": [{ "title": "S", "fields": fields }] }))
            .unwrap()
    }

    fn snap(value: serde_json::Value) -> ValueSnapshot {
        ValueSnapshot::from_json(&value).unwrap()
    }

    #[test]
    fn field_without_conditions_keeps_defaults() {
        let s = schema(json!([
            { "id": "a", "type": "text", "required": true },
            { "id": "b", "type": "text", "visible": false, "required": true }
        ]));
        let state = resolve(&s, &ValueSnapshot::new());
        assert!(state.is_visible("a"));
        assert!(state.is_required("a"));
        assert!(!state.is_visible("b"));
        assert!(!state.is_required("b"));
    }

    #[test]
    fn show_group_decides_visibility() {
        let s = schema(json!([
            { "id": "country", "type": "select" },
            {
                "id": "state", "type": "text", "required": true,
                "conditions": [
                    { "effect": "show", "operator": "equals", "field": "country", "value": "US" }
                ]
            }
        ]));
        let hidden = resolve(&s, &snap(json!({ "country": "CA" })));
        assert!(!hidden.is_visible("state"));
        assert!(!hidden.is_required("state"));

        let shown = resolve(&s, &snap(json!({ "country": "US" })));
        assert!(shown.is_visible("state"));
        assert!(shown.is_required("state"));
    }

    #[test]
    fn show_can_reveal_hidden_by_default() {
        let s = schema(json!([
            { "id": "other", "type": "checkbox" },
            {
                "id": "details", "type": "text", "visible": false,
                "conditions": [
                    { "effect": "show", "operator": "equals", "field": "other", "value": true }
                ]
            }
        ]));
        assert!(!resolve(&s, &snap(json!({ "other": false }))).is_visible("details"));
        assert!(resolve(&s, &snap(json!({ "other": true }))).is_visible("details"));
    }

    #[test]
    fn hide_wins_over_show() {
        let s = schema(json!([
            { "id": "a", "type": "text" },
            {
                "id": "b", "type": "text",
                "conditions": [
                    { "effect": "show", "operator": "is_not_empty", "field": "a" },
                    { "effect": "hide", "operator": "equals", "field": "a", "value": "secret" }
                ]
            }
        ]));
        assert!(resolve(&s, &snap(json!({ "a": "hello" }))).is_visible("b"));
        assert!(!resolve(&s, &snap(json!({ "a": "secret" }))).is_visible("b"));
    }

    #[test]
    fn require_wins_over_optional() {
        let s = schema(json!([
            { "id": "a", "type": "text" },
            {
                "id": "b", "type": "text", "required": true,
                "conditions": [
                    { "effect": "optional", "operator": "is_empty", "field": "a" },
                    { "effect": "require", "operator": "equals", "field": "a", "value": "" }
                ]
            }
        ]));
        // both groups true
        let state = resolve(&s, &snap(json!({ "a": "" })));
        assert!(state.is_required("b"));
        // optional only
        let state = resolve(&s, &ValueSnapshot::new());
        assert!(!state.is_required("b"));
        // neither: default
        let state = resolve(&s, &snap(json!({ "a": "x" })));
        assert!(state.is_required("b"));
    }

    #[test]
    fn require_on_optional_field() {
        let s = schema(json!([
            { "id": "employed", "type": "checkbox" },
            {
                "id": "employer", "type": "text",
                "conditions": [
                    { "effect": "require", "operator": "equals", "field": "employed", "value": true }
                ]
            }
        ]));
        assert!(!resolve(&s, &snap(json!({ "employed": false }))).is_required("employer"));
        assert!(resolve(&s, &snap(json!({ "employed": true }))).is_required("employer"));
    }

    #[test]
    fn any_combinator() {
        let s = schema(json!([
            { "id": "role", "type": "text" },
            {
                "id": "budget", "type": "number",
                "conditions": [
                    { "effect": "show", "operator": "equals", "field": "role", "value": "manager", "combinator": "any" },
                    { "effect": "show", "operator": "equals", "field": "role", "value": "director", "combinator": "any" }
                ]
            }
        ]));
        assert!(resolve(&s, &snap(json!({ "role": "director" }))).is_visible("budget"));
        assert!(!resolve(&s, &snap(json!({ "role": "intern" }))).is_visible("budget"));
    }

    #[test]
    fn hidden_source_value_still_counts() {
        let s = schema(json!([
            { "id": "a", "type": "text", "visible": false },
            {
                "id": "b", "type": "text",
                "conditions": [
                    { "effect": "show", "operator": "equals", "field": "a", "value": "go" }
                ]
            }
        ]));
        let state = resolve(&s, &snap(json!({ "a": "go" })));
        assert!(!state.is_visible("a"));
        assert!(state.is_visible("b"));
    }

    #[test]
    fn self_referential_rule() {
        let s = schema(json!([{
            "id": "code", "type": "text",
            "conditions": [
                { "effect": "hide", "operator": "equals", "field": "code", "value": "hide-me" }
            ]
        }]));
        assert!(resolve(&s, &snap(json!({ "code": "x" }))).is_visible("code"));
        assert!(!resolve(&s, &snap(json!({ "code": "hide-me" }))).is_visible("code"));
    }

    #[test]
    fn visible_ids_follow_schema_order() {
        let s = schema(json!([
            { "id": "z", "type": "text" },
            { "id": "a", "type": "text", "visible": false },
            { "id": "m", "type": "text" }
        ]));
        let state = resolve(&s, &ValueSnapshot::new());
        assert_eq!(state.visible_field_ids(), vec!["z", "m"]);
        assert_eq!(state.hidden_field_ids(), vec!["a"]);
    }

    #[test]
    fn newly_hidden_fields() {
        let s = schema(json!([
            { "id": "country", "type": "select" },
            {
                "id": "state", "type": "text",
                "conditions": [
                    { "effect": "show", "operator": "equals", "field": "country", "value": "US" }
                ]
            }
        ]));
        let before = resolve(&s, &snap(json!({ "country": "US" })));
        let after = resolve(&s, &snap(json!({ "country": "CA" })));
        assert_eq!(after.newly_hidden(&before), vec!["state"]);
        assert!(before.newly_hidden(&after).is_empty());
    }
}
