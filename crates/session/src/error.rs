use formgate_schema::SchemaError;
use formgate_transport::TransportError;

/// Errors returned by session operations. A refused operation leaves the
/// session unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An edit or submit arrived while a submission is in flight.
    #[error("a submission is already in progress")]
    SubmitInFlight,

    /// The form was submitted successfully; reset before editing again.
    #[error("the form has already been submitted")]
    AlreadySubmitted,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {0} does not accept file uploads")]
    NotAFileField(String),

    /// The session was reset while the request was in flight; its result
    /// was dropped.
    #[error("session was reset before the request completed")]
    Discarded,

    /// The schema load was superseded or cancelled.
    #[error("schema load cancelled")]
    Cancelled,

    #[error("session state lock poisoned while {0}")]
    StatePoisoned(&'static str),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Transport(TransportError),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Schema(schema) => SessionError::Schema(schema),
            other => SessionError::Transport(other),
        }
    }
}
