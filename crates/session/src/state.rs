use formgate_eval::{FieldState, ValidationErrors};
use formgate_transport::{SubmissionResult, SubmitterId};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Editing,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl SessionState {
    /// Whether a submission is being validated or sent.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Validating | SessionState::Submitting)
    }
}

/// What happens to the stored value of a field that becomes hidden.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HiddenValuePolicy {
    /// Keep the value. It is still seen by rules and reappears if the field
    /// is shown again, but it is never submitted while hidden.
    #[default]
    Retain,
    /// Drop the value as soon as an edit hides the field.
    ClearOnHide,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Sent as `user_id` with the submission.
    pub submitter: Option<SubmitterId>,
    pub hidden_values: HiddenValuePolicy,
}

impl SessionOptions {
    pub fn with_submitter(mut self, submitter: impl Into<SubmitterId>) -> Self {
        self.submitter = Some(submitter.into());
        self
    }

    pub fn with_hidden_values(mut self, policy: HiddenValuePolicy) -> Self {
        self.hidden_values = policy;
        self
    }
}

/// Everything a presentation layer needs to draw the form.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub field_state: FieldState,
    pub errors: ValidationErrors,
    /// Aggregate message of the last failed submission, while `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Set once the submission succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
}

/// Result of a [`submit`](crate::FormSession::submit) call that was not
/// refused outright.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Local validation failed; nothing was sent.
    Invalid(ValidationErrors),
    Submitted(SubmissionResult),
    /// The server rejected specific fields; their messages are now the
    /// session's errors.
    Rejected(ValidationErrors),
    /// The submission failed as a whole.
    Failed(String),
    /// The session was reset while the request was in flight and the
    /// response was dropped.
    Discarded,
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}
