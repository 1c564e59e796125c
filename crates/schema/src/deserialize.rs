//! Loading form version documents and checking their structure.
//!
//! Typed deserialization is delegated to serde; what serde cannot express
//! (id uniqueness across sections, rule references) is checked here.
//! Rules that are well-formed but cannot be meaningfully evaluated are not
//! rejected: they are logged and evaluate to `false` at runtime.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::types::{Combinator, Effect, FormSchema, FormVersion, Operator};

/// Parse a form version, unwrapping the `{"data": ...}` envelope if present.
pub fn version_from_json(value: &serde_json::Value) -> Result<FormVersion, SchemaError> {
    let body = unwrap_envelope(value);
    let obj = body
        .as_object()
        .ok_or_else(|| SchemaError::Malformed("form version must be a JSON object".to_string()))?;

    if !obj.get("schema").is_some_and(|s| s.is_object()) {
        let version_id = obj
            .get("id")
            .map(|id| match id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "<unknown>".to_string());
        return Err(SchemaError::MissingSchema { version_id });
    }

    let version: FormVersion = serde_json::from_value(body.clone())
        .map_err(|e| SchemaError::Malformed(e.to_string()))?;
    check_schema(&version.schema)?;
    debug!(
        version = %version.id,
        fields = version.schema.field_count(),
        rules = version.schema.rule_count(),
        "loaded form version"
    );
    Ok(version)
}

/// Parse a bare schema object.
pub fn schema_from_json(value: &serde_json::Value) -> Result<FormSchema, SchemaError> {
    let schema: FormSchema = serde_json::from_value(unwrap_envelope(value).clone())
        .map_err(|e| SchemaError::Malformed(e.to_string()))?;
    check_schema(&schema)?;
    Ok(schema)
}

fn unwrap_envelope(value: &serde_json::Value) -> &serde_json::Value {
    match value.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

/// Check the invariants serde cannot: every field id is non-empty and
/// unique across the schema, and every rule references an existing field.
pub fn check_schema(schema: &FormSchema) -> Result<(), SchemaError> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(schema.field_count());
    for section in &schema.sections {
        for field in &section.fields {
            if field.id.trim().is_empty() {
                return Err(SchemaError::EmptyFieldId {
                    section: section.key().to_string(),
                });
            }
            if !ids.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateFieldId {
                    field_id: field.id.clone(),
                });
            }
        }
    }

    for field in schema.fields() {
        let mut group_combinators: HashMap<Effect, Combinator> = HashMap::new();
        for rule in &field.conditions {
            if !ids.contains(rule.source_field_id.as_str()) {
                return Err(SchemaError::UnknownSourceField {
                    field_id: field.id.clone(),
                    source_field_id: rule.source_field_id.clone(),
                });
            }
            if rule.operator == Operator::Unknown {
                warn!(
                    field = %field.id,
                    source = %rule.source_field_id,
                    "condition uses an unknown operator and will never be satisfied"
                );
            }
            if rule.operator == Operator::OneOf && !rule.comparison_value.is_array() {
                warn!(
                    field = %field.id,
                    "one_of condition compares against a non-list value and will never be satisfied"
                );
            }
            if rule.source_field_id == field.id {
                debug!(field = %field.id, "self-referential condition");
            }
            let first = *group_combinators
                .entry(rule.target_effect)
                .or_insert(rule.combinator);
            if first != rule.combinator {
                warn!(
                    field = %field.id,
                    effect = ?rule.target_effect,
                    "conditions in one effect group mix combinators; the first rule's combinator applies"
                );
            }
        }
    }

    Ok(())
}
