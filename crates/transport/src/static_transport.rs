//! In-memory transport -- serves form versions from memory and records
//! every submission and upload it receives.
//!
//! Submission and upload outcomes can be scripted; unscripted calls
//! succeed. Fetches, submissions and uploads can also be gated so a test
//! can hold a request in flight and release it later.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use formgate_eval::SubmissionPayload;
use formgate_schema::{FormVersion, VersionId};
use tokio::sync::Semaphore;

use crate::error::TransportError;
use crate::record::{FileUpload, SubmissionResult, SubmitterId, UploadedFile};
use crate::traits::FormTransport;

/// A submission the transport received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSubmission {
    pub version_id: VersionId,
    pub payload: SubmissionPayload,
    pub submitter: Option<SubmitterId>,
}

/// An upload the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub version_id: VersionId,
    pub field_id: String,
    pub upload: FileUpload,
}

#[derive(Default)]
struct Recorded {
    submissions: Vec<RecordedSubmission>,
    uploads: Vec<RecordedUpload>,
    submit_outcomes: VecDeque<Result<SubmissionResult, TransportError>>,
    upload_outcomes: VecDeque<Result<UploadedFile, TransportError>>,
    next_file_id: u64,
}

/// Holds requests until released, one permit per request.
#[derive(Clone)]
struct Gate(Arc<Semaphore>);

impl Gate {
    fn new() -> Self {
        Gate(Arc::new(Semaphore::new(0)))
    }

    async fn pass(&self) -> Result<(), TransportError> {
        let permit = self
            .0
            .acquire()
            .await
            .map_err(|_| TransportError::Network("gate closed".to_string()))?;
        permit.forget();
        Ok(())
    }

    fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Default)]
pub struct StaticTransport {
    versions: HashMap<VersionId, FormVersion>,
    recorded: Mutex<Recorded>,
    submit_gate: Option<Gate>,
    fetch_gate: Option<Gate>,
    upload_gate: Option<Gate>,
}

impl StaticTransport {
    pub fn new() -> Self {
        StaticTransport::default()
    }

    /// Serve `version` under its own id.
    pub fn with_version(mut self, version: FormVersion) -> Self {
        self.versions.insert(version.id.clone(), version);
        self
    }

    /// Hold every submission until [`release_submission`] is called.
    ///
    /// [`release_submission`]: StaticTransport::release_submission
    pub fn with_gated_submissions(mut self) -> Self {
        self.submit_gate = Some(Gate::new());
        self
    }

    /// Hold every fetch until [`release_fetch`] is called.
    ///
    /// [`release_fetch`]: StaticTransport::release_fetch
    pub fn with_gated_fetches(mut self) -> Self {
        self.fetch_gate = Some(Gate::new());
        self
    }

    /// Hold every upload until [`release_upload`] is called.
    ///
    /// [`release_upload`]: StaticTransport::release_upload
    pub fn with_gated_uploads(mut self) -> Self {
        self.upload_gate = Some(Gate::new());
        self
    }

    pub fn release_upload(&self) {
        if let Some(gate) = &self.upload_gate {
            gate.release();
        }
    }

    pub fn release_submission(&self) {
        if let Some(gate) = &self.submit_gate {
            gate.release();
        }
    }

    pub fn release_fetch(&self) {
        if let Some(gate) = &self.fetch_gate {
            gate.release();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // A poisoned lock only means a test panicked mid-record.
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the outcome of the next unanswered submission.
    pub fn push_submit_outcome(&self, outcome: Result<SubmissionResult, TransportError>) {
        self.lock().submit_outcomes.push_back(outcome);
    }

    /// Queue the outcome of the next unanswered upload.
    pub fn push_upload_outcome(&self, outcome: Result<UploadedFile, TransportError>) {
        self.lock().upload_outcomes.push_back(outcome);
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.lock().submissions.clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.lock().uploads.clone()
    }
}

#[async_trait]
impl FormTransport for StaticTransport {
    async fn fetch_schema(&self, version_id: &VersionId) -> Result<FormVersion, TransportError> {
        if let Some(gate) = &self.fetch_gate {
            gate.pass().await?;
        }
        self.versions
            .get(version_id)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                version_id: version_id.to_string(),
            })
    }

    async fn submit_payload(
        &self,
        version_id: &VersionId,
        payload: &SubmissionPayload,
        submitter: Option<&SubmitterId>,
    ) -> Result<SubmissionResult, TransportError> {
        let number = {
            let mut recorded = self.lock();
            recorded.submissions.push(RecordedSubmission {
                version_id: version_id.clone(),
                payload: payload.clone(),
                submitter: submitter.cloned(),
            });
            recorded.submissions.len()
        };
        if let Some(gate) = &self.submit_gate {
            gate.pass().await?;
        }
        let scripted = self.lock().submit_outcomes.pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubmissionResult::from_body(serde_json::json!({
                "data": { "id": number }
            })))
        })
    }

    async fn upload_file(
        &self,
        version_id: &VersionId,
        field_id: &str,
        upload: FileUpload,
    ) -> Result<UploadedFile, TransportError> {
        let file_name = upload.file_name.clone();
        self.lock().uploads.push(RecordedUpload {
            version_id: version_id.clone(),
            field_id: field_id.to_string(),
            upload,
        });
        if let Some(gate) = &self.upload_gate {
            gate.pass().await?;
        }
        let mut recorded = self.lock();
        if let Some(outcome) = recorded.upload_outcomes.pop_front() {
            return outcome;
        }
        recorded.next_file_id += 1;
        let file_id = recorded.next_file_id;
        Ok(UploadedFile {
            file_id,
            url: format!("memory://uploads/{}/{}", file_id, file_name),
            temp_token: None,
        })
    }
}
