//! Condition rule evaluation.
//!
//! A rule tests one source field's value in the snapshot. Evaluation never
//! fails: any combination of operator and value shape that cannot be
//! evaluated (a non-numeric operand to `greater_than`, a `one_of` against
//! a non-list, an unknown operator) counts as "rule not satisfied".

use std::cmp::Ordering;

use formgate_schema::{ConditionRule, Operator};
use serde_json::Value;

use crate::numeric::compare_numeric;
use crate::values::{is_empty_value, value_text, values_equal, ValueSnapshot};

/// Evaluate a single rule against a snapshot. An absent source value is
/// treated as null.
pub fn evaluate(rule: &ConditionRule, snapshot: &ValueSnapshot) -> bool {
    let actual = snapshot
        .get(&rule.source_field_id)
        .unwrap_or(&Value::Null);
    let expected = &rule.comparison_value;

    match rule.operator {
        Operator::Equals => equals(actual, expected),
        Operator::NotEquals => !equals(actual, expected),
        Operator::Contains => contains(actual, expected).unwrap_or(false),
        Operator::NotContains => contains(actual, expected).is_some_and(|c| !c),
        Operator::GreaterThan => ordered(actual, expected, |o| o == Ordering::Greater),
        Operator::LessThan => ordered(actual, expected, |o| o == Ordering::Less),
        Operator::GreaterThanOrEqual => ordered(actual, expected, |o| o != Ordering::Less),
        Operator::LessThanOrEqual => ordered(actual, expected, |o| o != Ordering::Greater),
        Operator::IsEmpty => is_empty_value(Some(actual)),
        Operator::IsNotEmpty => !is_empty_value(Some(actual)),
        Operator::OneOf => one_of(actual, expected),
        Operator::Unknown => false,
    }
}

/// A single-element list (a multiselect with one choice) equals its element.
fn equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(_), Value::Array(_)) => values_equal(actual, expected),
        (Value::Array(items), _) => items.len() == 1 && values_equal(&items[0], expected),
        _ => values_equal(actual, expected),
    }
}

fn ordered(actual: &Value, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    compare_numeric(actual, expected).is_some_and(accept)
}

/// `None` when containment is meaningless for these shapes.
fn contains(actual: &Value, expected: &Value) -> Option<bool> {
    match actual {
        Value::String(haystack) => {
            let needle = value_text(expected)?;
            Some(haystack.contains(needle.as_str()))
        }
        Value::Array(items) => Some(items.iter().any(|item| values_equal(item, expected))),
        _ => None,
    }
}

fn one_of(actual: &Value, expected: &Value) -> bool {
    let Value::Array(allowed) = expected else {
        return false;
    };
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| allowed.iter().any(|a| values_equal(item, a))),
        _ => allowed.iter().any(|a| values_equal(actual, a)),
    }
}
