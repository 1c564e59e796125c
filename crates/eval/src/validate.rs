//! Validation of a value snapshot against the resolved field state.
//!
//! Only visible fields are checked, so a hidden field never carries an
//! error. An empty value is an error only when the field is required;
//! otherwise it is valid regardless of the field's other constraints.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use formgate_schema::{Field, FieldType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::macros::format_description;
use time::Date;

use crate::numeric::to_decimal;
use crate::resolve::FieldState;
use crate::values::{is_empty_value, value_text, values_equal, ValueSnapshot};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    InvalidNumber,
    BelowMinimum,
    AboveMaximum,
    TooShort,
    TooLong,
    PatternMismatch,
    InvalidEmail,
    InvalidDate,
    NotAnOption,
    InvalidFile,
    /// A list or object given to a field that takes a single value.
    InvalidValue,
    /// The upload collaborator refused the file.
    Upload,
    /// The server rejected the submission for this field.
    Server,
}

/// One field's validation failure, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        FieldError {
            kind,
            message: message.into(),
        }
    }

    pub fn required() -> Self {
        FieldError::new(FieldErrorKind::Required, "This field is required")
    }

    pub fn server(message: impl Into<String>) -> Self {
        FieldError::new(FieldErrorKind::Server, message)
    }

    pub fn upload(message: impl Into<String>) -> Self {
        FieldError::new(FieldErrorKind::Upload, message)
    }
}

/// Errors keyed by field id. Empty means the snapshot may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        ValidationErrors(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldError> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, error: FieldError) {
        self.0.insert(field_id.into(), error);
    }

    pub fn remove(&mut self, field_id: &str) -> Option<FieldError> {
        self.0.remove(field_id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldError)> {
        self.0.iter()
    }

    /// Drop errors on fields that are not visible in `state`.
    pub fn retain_visible(&mut self, state: &FieldState) {
        self.0.retain(|id, _| state.is_visible(id));
    }

    /// Merge per-field messages returned by the server. The first message
    /// for each field is kept; fields with no messages are skipped.
    pub fn merge_server(&mut self, errors: &BTreeMap<String, Vec<String>>) {
        for (field_id, messages) in errors {
            if let Some(first) = messages.first() {
                self.0.insert(field_id.clone(), FieldError::server(first.clone()));
            }
        }
    }

    /// Field id to message, for display.
    pub fn messages(&self) -> BTreeMap<&str, &str> {
        self.0
            .iter()
            .map(|(id, e)| (id.as_str(), e.message.as_str()))
            .collect()
    }
}

impl FromIterator<(String, FieldError)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (String, FieldError)>>(iter: I) -> Self {
        ValidationErrors(iter.into_iter().collect())
    }
}

/// Validate every visible field in `fields` against the snapshot.
pub fn validate<'a>(
    snapshot: &ValueSnapshot,
    state: &FieldState,
    fields: impl IntoIterator<Item = &'a Field>,
) -> ValidationErrors {
    fields
        .into_iter()
        .filter(|f| state.is_visible(&f.id))
        .filter_map(|f| {
            validate_field(f, snapshot.get(&f.id), state.is_required(&f.id))
                .map(|e| (f.id.clone(), e))
        })
        .collect()
}

/// Validate one field's value. `required` is the resolved flag, not the
/// field's default.
pub fn validate_field(field: &Field, value: Option<&Value>, required: bool) -> Option<FieldError> {
    if field.field_type == FieldType::Checkbox {
        return check_checkbox(value, required);
    }
    if is_empty_value(value) {
        return required.then(FieldError::required);
    }
    let value = value?;

    let failure = match &field.field_type {
        FieldType::Number => check_number(field, value),
        FieldType::Select | FieldType::Radio => check_single_choice(field, value),
        FieldType::Multiselect => check_multi_choice(field, value),
        FieldType::Date => check_date(value),
        FieldType::File => check_file(value),
        _ => check_text(field, value),
    }?;

    Some(match &field.validation.message {
        Some(message) => FieldError::new(failure.kind, message.clone()),
        None => failure,
    })
}

fn check_checkbox(value: Option<&Value>, required: bool) -> Option<FieldError> {
    let checked = match value {
        None => false,
        v if is_empty_value(v) => false,
        Some(v @ (Value::Bool(_) | Value::String(_))) => {
            if values_equal(v, &Value::Bool(true)) {
                true
            } else if values_equal(v, &Value::Bool(false)) {
                false
            } else {
                return Some(FieldError::new(
                    FieldErrorKind::InvalidValue,
                    "Must be checked or unchecked",
                ));
            }
        }
        Some(_) => {
            return Some(FieldError::new(
                FieldErrorKind::InvalidValue,
                "Must be checked or unchecked",
            ))
        }
    };
    (required && !checked).then(FieldError::required)
}

fn check_number(field: &Field, value: &Value) -> Option<FieldError> {
    let Some(n) = to_decimal(value) else {
        return Some(FieldError::new(
            FieldErrorKind::InvalidNumber,
            "Must be a number",
        ));
    };
    if let Some(min) = field.validation.min {
        if n < min {
            return Some(FieldError::new(
                FieldErrorKind::BelowMinimum,
                format!("Must be at least {}", min),
            ));
        }
    }
    if let Some(max) = field.validation.max {
        if n > max {
            return Some(FieldError::new(
                FieldErrorKind::AboveMaximum,
                format!("Must be at most {}", max),
            ));
        }
    }
    None
}

fn check_text(field: &Field, value: &Value) -> Option<FieldError> {
    let Some(text) = value_text(value) else {
        return Some(FieldError::new(
            FieldErrorKind::InvalidValue,
            "Must be a single value",
        ));
    };
    let rules = &field.validation;
    let length = text.chars().count();
    if let Some(min) = rules.min_length {
        if length < min {
            return Some(FieldError::new(
                FieldErrorKind::TooShort,
                format!("Must be at least {} characters", min),
            ));
        }
    }
    if let Some(max) = rules.max_length {
        if length > max {
            return Some(FieldError::new(
                FieldErrorKind::TooLong,
                format!("Must be at most {} characters", max),
            ));
        }
    }
    if field.field_type == FieldType::Email && !EMAIL.is_match(text.trim()) {
        return Some(FieldError::new(
            FieldErrorKind::InvalidEmail,
            "Must be a valid email address",
        ));
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(&text) {
            return Some(FieldError::new(
                FieldErrorKind::PatternMismatch,
                "Does not match the required format",
            ));
        }
    }
    None
}

/// Allowed values: the field's options plus `validation.options`. Empty
/// means any value is accepted.
fn allowed_values(field: &Field) -> Vec<&Value> {
    field
        .options
        .iter()
        .map(|o| &o.value)
        .chain(field.validation.options.iter())
        .collect()
}

fn is_allowed(allowed: &[&Value], value: &Value) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| values_equal(value, a))
}

fn not_an_option() -> FieldError {
    FieldError::new(
        FieldErrorKind::NotAnOption,
        "Not one of the available options",
    )
}

fn check_single_choice(field: &Field, value: &Value) -> Option<FieldError> {
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        return Some(FieldError::new(
            FieldErrorKind::InvalidValue,
            "Must be a single value",
        ));
    }
    (!is_allowed(&allowed_values(field), value)).then(not_an_option)
}

fn check_multi_choice(field: &Field, value: &Value) -> Option<FieldError> {
    let allowed = allowed_values(field);
    match value {
        Value::Array(items) => items
            .iter()
            .any(|item| !is_allowed(&allowed, item))
            .then(not_an_option),
        Value::Object(_) => Some(FieldError::new(
            FieldErrorKind::InvalidValue,
            "Must be a list of options",
        )),
        scalar => (!is_allowed(&allowed, scalar)).then(not_an_option),
    }
}

fn check_date(value: &Value) -> Option<FieldError> {
    let valid = value
        .as_str()
        .is_some_and(|s| Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).is_ok());
    (!valid).then(|| {
        FieldError::new(
            FieldErrorKind::InvalidDate,
            "Must be a date in YYYY-MM-DD format",
        )
    })
}

/// An uploaded-file object carrying a `file_id`, or a URL string.
fn check_file(value: &Value) -> Option<FieldError> {
    let valid = match value {
        Value::Object(obj) => obj.get("file_id").is_some_and(|id| !id.is_null()),
        Value::String(url) => !url.trim().is_empty(),
        _ => false,
    };
    (!valid).then(|| FieldError::new(FieldErrorKind::InvalidFile, "Must be an uploaded file"))
}
