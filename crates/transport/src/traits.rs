use async_trait::async_trait;
use formgate_eval::SubmissionPayload;
use formgate_schema::{FormVersion, VersionId};

use crate::error::TransportError;
use crate::record::{FileUpload, SubmissionResult, SubmitterId, UploadedFile};

/// The network collaborator of a form session.
///
/// The session controller validates locally before calling
/// [`submit_payload`](FormTransport::submit_payload); implementations never
/// see a payload that failed validation. Implementations must be
/// `Send + Sync` so a session can be shared across tasks.
#[async_trait]
pub trait FormTransport: Send + Sync {
    /// Fetch a form version and check its schema.
    ///
    /// Returns `Err(TransportError::NotFound)` for an unknown version and
    /// `Err(TransportError::Schema)` when the document does not load.
    async fn fetch_schema(&self, version_id: &VersionId) -> Result<FormVersion, TransportError>;

    /// Submit a validated payload.
    ///
    /// Returns `Err(TransportError::Rejected)` when the server refuses it,
    /// with per-field messages when the server gives them.
    async fn submit_payload(
        &self,
        version_id: &VersionId,
        payload: &SubmissionPayload,
        submitter: Option<&SubmitterId>,
    ) -> Result<SubmissionResult, TransportError>;

    /// Upload a file for a `file` field, ahead of submission.
    async fn upload_file(
        &self,
        version_id: &VersionId,
        field_id: &str,
        upload: FileUpload,
    ) -> Result<UploadedFile, TransportError>;
}
