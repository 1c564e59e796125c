use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the user submitting the form. Sent as a JSON number when it
/// is purely numeric, as a string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmitterId {
    Number(u64),
    Text(String),
}

impl From<&str> for SubmitterId {
    fn from(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => SubmitterId::Number(n),
            Err(_) => SubmitterId::Text(s.to_string()),
        }
    }
}

impl From<u64> for SubmitterId {
    fn from(n: u64) -> Self {
        SubmitterId::Number(n)
    }
}

impl fmt::Display for SubmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitterId::Number(n) => write!(f, "{}", n),
            SubmitterId::Text(s) => f.write_str(s),
        }
    }
}

/// What the submission endpoint answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The full response body.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl SubmissionResult {
    /// Interpret a submission response body. The id is looked up as `id`
    /// or `submission_id`, inside `data` when the body is wrapped.
    pub fn from_body(body: serde_json::Value) -> Self {
        let inner = match body.get("data") {
            Some(data) if data.is_object() => data,
            _ => &body,
        };
        let submission_id = ["submission_id", "id"]
            .iter()
            .find_map(|key| inner.get(*key))
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string);
        SubmissionResult {
            submission_id,
            message,
            body,
        }
    }
}

/// A file to upload for a `file` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        FileUpload {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// A stored upload, as returned by the upload endpoint. Serialized as-is
/// into the file field's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_token: Option<String>,
}

impl UploadedFile {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
