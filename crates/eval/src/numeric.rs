//! Numeric coercion using `rust_decimal`.
//!
//! Form values arrive as JSON numbers or as text typed into an input, so
//! both are accepted. All comparisons go through `Decimal`; there is no
//! `f64` arithmetic in the evaluation path.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Coerce a raw value to a decimal. Numbers and numeric strings (surrounding
/// whitespace ignored, scientific notation accepted) coerce; everything else
/// yields `None`.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                parse_decimal(&n.to_string())
            }
        }
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    // digit separators are accepted by the decimal parser but not by users
    if text.is_empty() || text.contains('_') {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Order two values numerically. `None` when either side does not coerce.
pub fn compare_numeric(left: &Value, right: &Value) -> Option<Ordering> {
    let l = to_decimal(left)?;
    let r = to_decimal(right)?;
    Some(l.cmp(&r))
}
