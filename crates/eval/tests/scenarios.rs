//! End-to-end engine scenarios over whole schemas.
//!
//! Organized by category:
//!   A. Conditional visibility and the payload
//!   B. Numeric validation
//!   C. Combined conditions
//!   D. Properties that hold for every snapshot
//!
//! Each test builds a schema document directly and runs it through
//! `evaluate_form` / `prepare_submission`, the same entry points the
//! session controller uses.

use formgate_eval::{
    evaluate_form, prepare_submission, resolve, validate, FieldErrorKind, ValueSnapshot,
};
use formgate_schema::{FormSchema, FormVersion};
use serde_json::json;

// ──────────────────────────────────────────────
// Test helpers
// ──────────────────────────────────────────────

fn schema(fields: serde_json::Value) -> FormSchema {
    FormSchema::from_json(&json!({
        "sections": [{ "title": "Main", "fields": fields }]
    }))
    .unwrap()
}

fn snap(values: serde_json::Value) -> ValueSnapshot {
    ValueSnapshot::from_json(&values).unwrap()
}

/// Country/state form: `state` shows (and is then required) for the US.
fn address_schema() -> FormSchema {
    schema(json!([
        {
            "id": "country", "type": "select", "label": "Country", "required": true,
            "options": ["US", "CA"]
        },
        {
            "id": "state", "type": "text", "label": "State", "required": true,
            "conditions": [
                { "effect": "show", "operator": "equals", "field": "country", "value": "US" }
            ]
        }
    ]))
}

/// Employment form used by the property tests: several effects per field,
/// a self-reference and an `any` group.
fn employment_version() -> FormVersion {
    FormVersion::from_json(&json!({
        "data": {
            "id": 12,
            "schema": {
                "ui_settings": { "form_title": "Employment" },
                "sections": [
                    {
                        "id": "person",
                        "title": "Person",
                        "fields": [
                            { "id": "name", "type": "text", "required": true, "validation": { "min_length": 2 } },
                            { "id": "email", "type": "email", "required": true },
                            { "id": "employed", "type": "checkbox" }
                        ]
                    },
                    {
                        "title": "Job",
                        "fields": [
                            {
                                "id": "employer", "type": "text", "visible": false,
                                "conditions": [
                                    { "effect": "show", "operator": "equals", "field": "employed", "value": true },
                                    { "effect": "require", "operator": "equals", "field": "employed", "value": true }
                                ]
                            },
                            {
                                "id": "role", "type": "select",
                                "options": ["engineer", "manager", "director"],
                                "conditions": [
                                    { "effect": "hide", "operator": "not_equals", "field": "employed", "value": true }
                                ]
                            },
                            {
                                "id": "reports", "type": "number", "validation": { "min": 1 },
                                "conditions": [
                                    { "effect": "show", "operator": "one_of", "field": "role", "value": ["manager", "director"] },
                                    { "effect": "require", "operator": "is_not_empty", "field": "role" }
                                ]
                            },
                            {
                                "id": "referral", "type": "text",
                                "conditions": [
                                    { "effect": "hide", "operator": "equals", "field": "referral", "value": "none", "combinator": "any" },
                                    { "effect": "hide", "operator": "contains", "field": "email", "value": "@internal.", "combinator": "any" }
                                ]
                            }
                        ]
                    }
                ]
            },
            "config": { "submission_settings": { "success_message": "Thanks!" } }
        }
    }))
    .unwrap()
}

fn sample_snapshots() -> Vec<ValueSnapshot> {
    vec![
        ValueSnapshot::new(),
        snap(json!({ "name": "Ada", "email": "ada@example.com", "employed": false })),
        snap(json!({ "name": "Ada", "email": "ada@example.com", "employed": true })),
        snap(json!({
            "name": "Ada", "email": "ada@internal.example", "employed": true,
            "employer": "Acme", "role": "manager", "reports": 0, "referral": "Bob"
        })),
        snap(json!({
            "name": "A", "email": "bad", "employed": "true",
            "role": "director", "reports": "12", "referral": "none"
        })),
        snap(json!({ "employed": false, "role": "manager", "reports": 3, "employer": "Old" })),
    ]
}

// ──────────────────────────────────────────────
// A. Conditional visibility and the payload
// ──────────────────────────────────────────────

#[test]
fn scenario_a_state_hidden_outside_us() {
    let schema = address_schema();
    let snapshot = snap(json!({ "country": "CA", "state": "BC" }));
    let eval = evaluate_form(&schema, &snapshot);
    assert!(!eval.state.is_visible("state"));
    assert!(!eval.state.is_required("state"));
    assert!(eval.errors.is_empty());

    let payload = prepare_submission(&schema, &snapshot).unwrap();
    assert!(!payload.contains("state"));
    assert_eq!(payload.to_json(), json!({ "country": "CA" }));
}

#[test]
fn scenario_a_state_required_for_us() {
    let schema = address_schema();
    let snapshot = snap(json!({ "country": "US" }));
    let eval = evaluate_form(&schema, &snapshot);
    assert!(eval.state.is_visible("state"));
    assert!(eval.state.is_required("state"));

    let errors = prepare_submission(&schema, &snapshot).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get("state").unwrap().kind, FieldErrorKind::Required);

    let filled = snapshot.with_value("state", json!("NY"));
    let payload = prepare_submission(&schema, &filled).unwrap();
    assert_eq!(payload.to_json(), json!({ "country": "US", "state": "NY" }));
}

// ──────────────────────────────────────────────
// B. Numeric validation
// ──────────────────────────────────────────────

#[test]
fn scenario_b_minimum_age() {
    let schema = schema(json!([
        { "id": "age", "type": "number", "validation": { "min": 18 } }
    ]));
    let errors = evaluate_form(&schema, &snap(json!({ "age": 15 }))).errors;
    assert_eq!(errors.get("age").unwrap().kind, FieldErrorKind::BelowMinimum);

    let errors = evaluate_form(&schema, &snap(json!({ "age": 21 }))).errors;
    assert!(errors.is_empty());
}

// ──────────────────────────────────────────────
// C. Combined conditions
// ──────────────────────────────────────────────

#[test]
fn scenario_c_all_combinator() {
    let schema = schema(json!([
        { "id": "role", "type": "text" },
        { "id": "tenure_years", "type": "number" },
        {
            "id": "bonus", "type": "number",
            "conditions": [
                { "effect": "show", "operator": "equals", "field": "role", "value": "manager", "combinator": "all" },
                { "effect": "show", "operator": "greater_than_or_equal", "field": "tenure_years", "value": 2, "combinator": "all" }
            ]
        }
    ]));
    let hidden = resolve(&schema, &snap(json!({ "role": "manager", "tenure_years": 1 })));
    assert!(!hidden.is_visible("bonus"));
    let shown = resolve(&schema, &snap(json!({ "role": "manager", "tenure_years": 3 })));
    assert!(shown.is_visible("bonus"));
}

#[test]
fn employment_flow() {
    let version = employment_version();
    let schema = &version.schema;
    assert_eq!(version.config.success_message(), "Thanks!");

    let unemployed = snap(json!({ "name": "Ada", "email": "ada@example.com", "employed": false }));
    let eval = evaluate_form(schema, &unemployed);
    assert_eq!(
        eval.state.visible_field_ids(),
        vec!["name", "email", "employed", "referral"]
    );
    assert!(eval.errors.is_empty());

    let employed = unemployed.with_value("employed", json!(true));
    let eval = evaluate_form(schema, &employed);
    assert!(eval.state.is_required("employer"));
    assert_eq!(eval.errors.get("employer").unwrap().kind, FieldErrorKind::Required);
    assert!(!eval.state.is_visible("reports"));

    let manager = employed
        .with_value("employer", json!("Acme"))
        .with_value("role", json!("manager"));
    let eval = evaluate_form(schema, &manager);
    assert!(eval.state.is_required("reports"));
    assert_eq!(eval.errors.get("reports").unwrap().kind, FieldErrorKind::Required);

    let payload = prepare_submission(schema, &manager.with_value("reports", json!(4))).unwrap();
    assert_eq!(
        payload.to_json(),
        json!({
            "name": "Ada", "email": "ada@example.com", "employed": true,
            "employer": "Acme", "role": "manager", "reports": 4, "referral": null
        })
    );
}

// ──────────────────────────────────────────────
// D. Properties
// ──────────────────────────────────────────────

#[test]
fn resolution_is_idempotent() {
    let version = employment_version();
    for snapshot in sample_snapshots() {
        let first = evaluate_form(&version.schema, &snapshot);
        let second = evaluate_form(&version.schema, &snapshot);
        assert_eq!(first, second);
    }
}

#[test]
fn hidden_fields_are_never_required() {
    let version = employment_version();
    for snapshot in sample_snapshots() {
        let state = resolve(&version.schema, &snapshot);
        for id in state.hidden_field_ids() {
            assert!(!state.is_required(id), "{} hidden but required", id);
        }
    }
}

#[test]
fn payload_keys_equal_visible_set() {
    let version = employment_version();
    for snapshot in sample_snapshots() {
        let state = resolve(&version.schema, &snapshot);
        let payload = formgate_eval::build_payload(&snapshot, state.visible_field_ids());
        let mut visible = state.visible_field_ids();
        visible.sort_unstable();
        assert_eq!(payload.keys().collect::<Vec<_>>(), visible);
    }
}

#[test]
fn hidden_fields_never_carry_errors() {
    let version = employment_version();
    for snapshot in sample_snapshots() {
        let state = resolve(&version.schema, &snapshot);
        let errors = validate(&snapshot, &state, version.schema.fields());
        for (id, _) in errors.iter() {
            assert!(state.is_visible(id), "{} hidden but has an error", id);
        }
    }
}
