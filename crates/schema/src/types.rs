//! Typed structs for the form version JSON document.
//!
//! Wire names follow the schema endpoint (`type`, `required`, `visible`,
//! `effect`, `field`, `value`); the Rust field names follow what the engine
//! does with them. Both spellings are accepted on input.

use std::fmt;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::deserialize;
use crate::error::SchemaError;

// ──────────────────────────────────────────────
// Version envelope
// ──────────────────────────────────────────────

/// Identifier of a form version. The endpoint accepts and returns either
/// a number or a string; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        VersionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        VersionId(s.to_string())
    }
}

impl From<String> for VersionId {
    fn from(s: String) -> Self {
        VersionId(s)
    }
}

impl From<u64> for VersionId {
    fn from(n: u64) -> Self {
        VersionId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => VersionId::from(n),
            Raw::Text(s) => VersionId(s),
        })
    }
}

/// A fetched form version: the schema plus its submission configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormVersion {
    pub id: VersionId,
    pub schema: FormSchema,
    #[serde(default)]
    pub config: FormConfig,
}

impl FormVersion {
    /// Parse and check a form version document.
    ///
    /// Accepts either the bare version object or the `{"data": {...}}`
    /// envelope the schema endpoint wraps it in.
    pub fn from_json(value: &serde_json::Value) -> Result<FormVersion, SchemaError> {
        deserialize::version_from_json(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default)]
    pub submission_settings: SubmissionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

impl FormConfig {
    pub fn submit_button_text(&self) -> &str {
        self.submission_settings
            .submit_button_text
            .as_deref()
            .unwrap_or("Submit")
    }

    pub fn success_message(&self) -> &str {
        self.submission_settings
            .success_message
            .as_deref()
            .unwrap_or("Form submitted successfully")
    }
}

// ──────────────────────────────────────────────
// Schema, sections, fields
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub sections: Vec<Section>,
    #[serde(default)]
    pub ui_settings: UiSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_title: Option<String>,
}

impl FormSchema {
    /// Parse and check a bare schema object (`{"sections": [...]}`).
    pub fn from_json(value: &serde_json::Value) -> Result<FormSchema, SchemaError> {
        deserialize::schema_from_json(value)
    }

    /// All fields across all sections, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields().find(|f| f.id == id)
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// Total number of condition rules, the cost of one resolution pass.
    pub fn rule_count(&self) -> usize {
        self.fields().map(|f| f.conditions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Section {
    /// Stable key for the section: its id, or its title when it has none.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.title)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "required", alias = "required_default")]
    pub required_default: bool,
    #[serde(
        default = "default_true",
        rename = "visible",
        alias = "visible_default"
    )]
    pub visible_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_width: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionRule>,
}

impl Field {
    /// Columns the field spans on a 12-column grid. Only 3, 4 and 6 are
    /// honoured; anything else takes the full row.
    pub fn column_span(&self) -> u8 {
        match self.grid_width {
            Some(w @ (3 | 4 | 6)) => w,
            _ => 12,
        }
    }

    /// Value the field holds before the user touches it.
    pub fn initial_value(&self) -> Option<serde_json::Value> {
        match (&self.default_value, &self.field_type) {
            (Some(v), _) => Some(v.clone()),
            (None, FieldType::Checkbox) => Some(serde_json::Value::Bool(false)),
            (None, _) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Number,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Date,
    File,
    /// Any type name this engine does not know; validated as free text.
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Multiselect => "multiselect",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::File => "file",
            FieldType::Other(name) => name,
        }
    }

    /// Whether values of this type are free text.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Textarea | FieldType::Email | FieldType::Other(_)
        )
    }

    /// Whether values must come from the field's option list.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Multiselect | FieldType::Radio
        )
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "email" => FieldType::Email,
            "number" => FieldType::Number,
            "select" => FieldType::Select,
            "multiselect" | "multi_select" => FieldType::Multiselect,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "date" => FieldType::Date,
            "file" => FieldType::File,
            _ => FieldType::Other(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One choice of a select, radio or multiselect field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OptionRepr")]
pub struct FieldOption {
    pub value: serde_json::Value,
    pub label: String,
}

/// Options arrive either as plain values or as `{value, label}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionRepr {
    Labeled {
        value: serde_json::Value,
        #[serde(default)]
        label: Option<String>,
    },
    Plain(serde_json::Value),
}

impl From<OptionRepr> for FieldOption {
    fn from(repr: OptionRepr) -> Self {
        let (value, label) = match repr {
            OptionRepr::Labeled { value, label } => (value, label),
            OptionRepr::Plain(value) => (value, None),
        };
        let label = label.unwrap_or_else(|| match &value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        FieldOption { value, label }
    }
}

// ──────────────────────────────────────────────
// Validation constraints
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    /// Allowed values in addition to the field's own option list.
    #[serde(
        default,
        alias = "allowed",
        alias = "allowed_options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<serde_json::Value>,
    /// Replaces the default message of any constraint failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A `pattern` constraint compiled once at load time. The whole value must
/// match, as with the HTML `pattern` attribute.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Pattern, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(|e| {
            serde::de::Error::custom(format!("invalid pattern '{}': {}", source, e))
        })
    }
}

// ──────────────────────────────────────────────
// Condition rules
// ──────────────────────────────────────────────

/// A dependency clause tying a field's visibility or required-ness to
/// another field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
    #[serde(rename = "effect", alias = "target_effect", alias = "action")]
    pub target_effect: Effect,
    pub operator: Operator,
    #[serde(rename = "field", alias = "source_field_id")]
    pub source_field_id: String,
    #[serde(default, rename = "value", alias = "comparison_value")]
    pub comparison_value: serde_json::Value,
    #[serde(default)]
    pub combinator: Combinator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Show,
    Hide,
    Require,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    OneOf,
    /// An operator name this engine does not know. Never satisfied.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combinator {
    #[default]
    #[serde(alias = "and")]
    All,
    #[serde(alias = "or")]
    Any,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_id_accepts_number_and_string() {
        let n: VersionId = serde_json::from_value(json!(3)).unwrap();
        let s: VersionId = serde_json::from_value(json!("v3")).unwrap();
        assert_eq!(n.as_str(), "3");
        assert_eq!(s.to_string(), "v3");
    }

    #[test]
    fn field_wire_names_and_defaults() {
        let field: Field = serde_json::from_value(json!({
            "id": "email",
            "type": "email",
            "label": "Email",
            "required": true
        }))
        .unwrap();
        assert_eq!(field.field_type, FieldType::Email);
        assert!(field.required_default);
        assert!(field.visible_default);
        assert!(field.conditions.is_empty());
        assert_eq!(field.column_span(), 12);
    }

    #[test]
    fn field_accepts_spec_spelling() {
        let field: Field = serde_json::from_value(json!({
            "id": "notes",
            "type": "textarea",
            "required_default": false,
            "visible_default": false,
            "grid_width": 6
        }))
        .unwrap();
        assert!(!field.visible_default);
        assert_eq!(field.column_span(), 6);
    }

    #[test]
    fn unknown_field_type_is_kept() {
        let field: Field =
            serde_json::from_value(json!({ "id": "phone", "type": "tel" })).unwrap();
        assert_eq!(field.field_type, FieldType::Other("tel".to_string()));
        assert!(field.field_type.is_text_like());
        assert_eq!(serde_json::to_value(&field.field_type).unwrap(), json!("tel"));
    }

    #[test]
    fn options_plain_and_labeled() {
        let field: Field = serde_json::from_value(json!({
            "id": "country",
            "type": "select",
            "options": ["CA", { "value": "US", "label": "United States" }, 7]
        }))
        .unwrap();
        assert_eq!(field.options.len(), 3);
        assert_eq!(field.options[0].label, "CA");
        assert_eq!(field.options[1].value, json!("US"));
        assert_eq!(field.options[1].label, "United States");
        assert_eq!(field.options[2].label, "7");
    }

    #[test]
    fn condition_rule_wire_names() {
        let rule: ConditionRule = serde_json::from_value(json!({
            "effect": "show",
            "operator": "equals",
            "field": "country",
            "value": "US"
        }))
        .unwrap();
        assert_eq!(rule.target_effect, Effect::Show);
        assert_eq!(rule.operator, Operator::Equals);
        assert_eq!(rule.source_field_id, "country");
        assert_eq!(rule.combinator, Combinator::All);
    }

    #[test]
    fn unknown_operator_deserializes() {
        let rule: ConditionRule = serde_json::from_value(json!({
            "target_effect": "hide",
            "operator": "matches_regex",
            "source_field_id": "x",
            "combinator": "or"
        }))
        .unwrap();
        assert_eq!(rule.operator, Operator::Unknown);
        assert_eq!(rule.combinator, Combinator::Any);
        assert_eq!(rule.comparison_value, serde_json::Value::Null);
    }

    #[test]
    fn pattern_is_anchored() {
        let p = Pattern::new(r"\d{5}").unwrap();
        assert!(p.is_match("12345"));
        assert!(!p.is_match("123456"));
        assert!(!p.is_match("a12345"));
    }

    #[test]
    fn invalid_pattern_fails_deserialization() {
        let result: Result<ValidationRules, _> =
            serde_json::from_value(json!({ "pattern": "([a-z" }));
        assert!(result.is_err());
    }

    #[test]
    fn numeric_bounds_accept_numbers_and_strings() {
        let rules: ValidationRules =
            serde_json::from_value(json!({ "min": 18, "max": "99.5" })).unwrap();
        assert_eq!(rules.min, Some(Decimal::from(18)));
        assert_eq!(rules.max, Some(Decimal::new(995, 1)));
    }

    #[test]
    fn checkbox_initial_value_is_false() {
        let field: Field =
            serde_json::from_value(json!({ "id": "agree", "type": "checkbox" })).unwrap();
        assert_eq!(field.initial_value(), Some(json!(false)));
    }

    #[test]
    fn config_defaults() {
        let config = FormConfig::default();
        assert_eq!(config.submit_button_text(), "Submit");
        assert_eq!(config.success_message(), "Form submitted successfully");
    }
}
