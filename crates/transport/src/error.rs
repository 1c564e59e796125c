use std::collections::BTreeMap;

use formgate_schema::SchemaError;

/// All errors that can be returned by a FormTransport implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The requested form version does not exist.
    #[error("form version not found: {version_id}")]
    NotFound { version_id: String },

    /// The server refused the request. `errors` carries per-field messages
    /// when the server reported any.
    #[error("{message}")]
    Rejected {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    /// The request never produced a usable response (connection failure,
    /// timeout, an error status without a readable body).
    #[error("network error: {0}")]
    Network(String),

    /// The fetched document is not a valid form version.
    #[error("invalid form schema: {0}")]
    Schema(#[from] SchemaError),

    /// A success response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn rejected(message: impl Into<String>) -> Self {
        TransportError::Rejected {
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    /// Per-field messages, empty unless the server rejected specific fields.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            TransportError::Rejected { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }
}
