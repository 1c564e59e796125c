use std::sync::{Arc, Mutex, MutexGuard};

use formgate_eval::{
    build_payload, evaluate_form, resolve, FieldError, FieldState, ValidationErrors, ValueSnapshot,
};
use formgate_schema::{FieldType, FormSchema, FormVersion, VersionId};
use formgate_transport::{FileUpload, FormTransport, UploadedFile};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::SessionError;
use crate::loader::SchemaLoader;
use crate::state::{HiddenValuePolicy, SessionOptions, SessionState, SessionView, SubmitOutcome};

type SessionResult<T> = Result<T, SessionError>;

const SUBMIT_ABANDONED: &str = "submission was interrupted before the server answered";

struct Inner {
    state: SessionState,
    snapshot: ValueSnapshot,
    field_state: FieldState,
    errors: ValidationErrors,
    failure: Option<String>,
    success_message: Option<String>,
    /// Bumped on every reset; responses started under an older epoch are
    /// dropped.
    epoch: u64,
}

impl Inner {
    fn view(&self) -> SessionView {
        SessionView {
            state: self.state,
            field_state: self.field_state.clone(),
            errors: self.errors.clone(),
            failure: self.failure.clone(),
            success_message: self.success_message.clone(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            trace!(from = ?self.state, to = ?next, "session state");
            self.state = next;
        }
    }

    /// Refuse edits while a submission is running or after it succeeded.
    fn ensure_editable(&self) -> SessionResult<()> {
        match self.state {
            SessionState::Validating | SessionState::Submitting => {
                Err(SessionError::SubmitInFlight)
            }
            SessionState::Succeeded => Err(SessionError::AlreadySubmitted),
            SessionState::Idle | SessionState::Editing | SessionState::Failed => Ok(()),
        }
    }
}

/// One user's pass through one form version.
///
/// All methods take `&self`; the session is `Send + Sync` and is usually
/// shared behind an `Arc`. The internal lock is never held across an
/// `.await`, so edits made while a submission is in flight are refused
/// promptly rather than queued.
pub struct FormSession {
    version: Arc<FormVersion>,
    transport: Arc<dyn FormTransport>,
    options: SessionOptions,
    inner: Mutex<Inner>,
    view_tx: watch::Sender<SessionView>,
}

impl FormSession {
    /// Start a session on an already loaded form version. Values start from
    /// the schema defaults.
    pub fn new(
        version: FormVersion,
        transport: Arc<dyn FormTransport>,
        options: SessionOptions,
    ) -> Self {
        let snapshot = ValueSnapshot::from_defaults(&version.schema);
        let field_state = resolve(&version.schema, &snapshot);
        let inner = Inner {
            state: SessionState::Idle,
            snapshot,
            field_state,
            errors: ValidationErrors::new(),
            failure: None,
            success_message: None,
            epoch: 0,
        };
        let (view_tx, _) = watch::channel(inner.view());
        FormSession {
            version: Arc::new(version),
            transport,
            options,
            inner: Mutex::new(inner),
            view_tx,
        }
    }

    /// Fetch `version_id` through `loader` and start a session on it.
    pub async fn open(
        transport: Arc<dyn FormTransport>,
        loader: &SchemaLoader,
        version_id: &VersionId,
        options: SessionOptions,
    ) -> SessionResult<Self> {
        let version = loader.load(transport.as_ref(), version_id).await?;
        Ok(FormSession::new(version, transport, options))
    }

    pub fn version(&self) -> &FormVersion {
        &self.version
    }

    pub fn schema(&self) -> &FormSchema {
        &self.version.schema
    }

    fn lock(&self, context: &'static str) -> SessionResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| SessionError::StatePoisoned(context))
    }

    fn publish(&self, inner: &Inner) {
        self.view_tx.send_replace(inner.view());
    }

    /// Receive a fresh [`SessionView`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> SessionResult<SessionView> {
        Ok(self.lock("reading view")?.view())
    }

    pub fn state(&self) -> SessionResult<SessionState> {
        Ok(self.lock("reading state")?.state)
    }

    pub fn snapshot(&self) -> SessionResult<ValueSnapshot> {
        Ok(self.lock("reading snapshot")?.snapshot.clone())
    }

    pub fn field_state(&self) -> SessionResult<FieldState> {
        Ok(self.lock("reading field state")?.field_state.clone())
    }

    pub fn errors(&self) -> SessionResult<ValidationErrors> {
        Ok(self.lock("reading errors")?.errors.clone())
    }

    // ──────────────────────────────────────────────
    // Editing
    // ──────────────────────────────────────────────

    /// Replace one field's value and recompute the field state.
    ///
    /// Clears the field's own error and any error on a field the edit hid.
    pub fn set_field_value(&self, field_id: &str, value: Value) -> SessionResult<()> {
        let mut inner = self.lock("setting field value")?;
        inner.ensure_editable()?;
        if self.schema().field(field_id).is_none() {
            return Err(SessionError::UnknownField(field_id.to_string()));
        }
        self.apply_value(&mut inner, field_id, value);
        self.publish(&inner);
        Ok(())
    }

    fn apply_value(&self, inner: &mut Inner, field_id: &str, value: Value) {
        let schema = self.schema();
        let mut snapshot = inner.snapshot.with_value(field_id, value);
        let mut field_state = resolve(schema, &snapshot);

        // Clearing a value can hide further fields; stops once nothing
        // newly hidden still holds a value, since every pass removes one.
        if self.options.hidden_values == HiddenValuePolicy::ClearOnHide {
            loop {
                let hidden: Vec<String> = field_state
                    .newly_hidden(&inner.field_state)
                    .into_iter()
                    .filter(|id| snapshot.contains(id))
                    .map(str::to_string)
                    .collect();
                if hidden.is_empty() {
                    break;
                }
                debug!(fields = ?hidden, "clearing values of hidden fields");
                for id in &hidden {
                    snapshot.remove(id);
                }
                field_state = resolve(schema, &snapshot);
            }
        }

        inner.snapshot = snapshot;
        inner.errors.remove(field_id);
        inner.errors.retain_visible(&field_state);
        inner.field_state = field_state;
        inner.failure = None;
        inner.transition(SessionState::Editing);
    }

    /// Move a failed session back to editing so the user can retry.
    pub fn acknowledge_failure(&self) -> SessionResult<()> {
        let mut inner = self.lock("acknowledging failure")?;
        if inner.state == SessionState::Failed {
            inner.failure = None;
            inner.transition(SessionState::Editing);
            self.publish(&inner);
        }
        Ok(())
    }

    /// Return to the schema defaults from any state. A submission still in
    /// flight is discarded when it completes.
    pub fn reset(&self) -> SessionResult<()> {
        let mut inner = self.lock("resetting session")?;
        let schema = self.schema();
        inner.snapshot = ValueSnapshot::from_defaults(schema);
        inner.field_state = resolve(schema, &inner.snapshot);
        inner.errors.clear();
        inner.failure = None;
        inner.success_message = None;
        inner.epoch += 1;
        inner.transition(SessionState::Idle);
        debug!(version = %self.version.id, epoch = inner.epoch, "session reset");
        self.publish(&inner);
        Ok(())
    }

    // ──────────────────────────────────────────────
    // Submission
    // ──────────────────────────────────────────────

    /// Validate and, when valid, submit the visible fields.
    ///
    /// Returns `Err` only when the submit is refused (another submission is
    /// in flight, or the form already succeeded). Every other result,
    /// including transport failures, is reported as a [`SubmitOutcome`] and
    /// reflected in the session state. Server field errors are kept only for
    /// visible fields; a rejection with none left counts as `Failed`.
    ///
    /// Dropping the returned future mid-request leaves the session `Failed`.
    pub async fn submit(&self) -> SessionResult<SubmitOutcome> {
        let (payload, epoch) = {
            let mut inner = self.lock("preparing submit")?;
            inner.ensure_editable()?;
            inner.transition(SessionState::Validating);
            self.publish(&inner);

            let evaluation = evaluate_form(self.schema(), &inner.snapshot);
            inner.field_state = evaluation.state;
            if !evaluation.errors.is_empty() {
                debug!(errors = evaluation.errors.len(), "submit blocked by validation");
                inner.errors = evaluation.errors.clone();
                inner.transition(SessionState::Editing);
                self.publish(&inner);
                return Ok(SubmitOutcome::Invalid(evaluation.errors));
            }

            inner.errors.clear();
            inner.failure = None;
            let payload = build_payload(&inner.snapshot, inner.field_state.visible_field_ids());
            inner.transition(SessionState::Submitting);
            self.publish(&inner);
            (payload, inner.epoch)
        };

        let guard = SubmitGuard::new(self, epoch);
        let result = self
            .transport
            .submit_payload(&self.version.id, &payload, self.options.submitter.as_ref())
            .await;
        guard.disarm();

        let mut inner = self.lock("completing submit")?;
        if inner.epoch != epoch {
            debug!(version = %self.version.id, "discarding submission response after reset");
            return Ok(SubmitOutcome::Discarded);
        }

        let outcome = match result {
            Ok(submitted) => {
                info!(
                    version = %self.version.id,
                    submission = submitted.submission_id.as_deref().unwrap_or("-"),
                    "form submitted"
                );
                inner.success_message = Some(self.version.config.success_message().to_string());
                inner.transition(SessionState::Succeeded);
                SubmitOutcome::Submitted(submitted)
            }
            Err(err) => {
                // only errors on fields the user can see are actionable
                let mut field_errors = ValidationErrors::new();
                if let Some(server) = err.field_errors() {
                    field_errors.merge_server(server);
                    field_errors.retain_visible(&inner.field_state);
                }
                if field_errors.is_empty() {
                    warn!(version = %self.version.id, error = %err, "submission failed");
                    let message = err.to_string();
                    inner.failure = Some(message.clone());
                    inner.transition(SessionState::Failed);
                    SubmitOutcome::Failed(message)
                } else {
                    info!(version = %self.version.id, fields = field_errors.len(), "submission rejected");
                    inner.errors = field_errors;
                    inner.transition(SessionState::Editing);
                    SubmitOutcome::Rejected(inner.errors.clone())
                }
            }
        };
        self.publish(&inner);
        Ok(outcome)
    }

    // ──────────────────────────────────────────────
    // Uploads
    // ──────────────────────────────────────────────

    /// Upload a file for a `file` field and store the result as its value.
    ///
    /// A failed upload leaves the value untouched, attaches an `Upload`
    /// error to the field and returns the transport error. An upload that
    /// completes after a reset returns [`SessionError::Discarded`]; one that
    /// completes once a submission has started is refused like an edit.
    pub async fn upload_file(
        &self,
        field_id: &str,
        upload: FileUpload,
    ) -> SessionResult<UploadedFile> {
        let epoch = {
            let inner = self.lock("preparing upload")?;
            inner.ensure_editable()?;
            let field = self
                .schema()
                .field(field_id)
                .ok_or_else(|| SessionError::UnknownField(field_id.to_string()))?;
            if field.field_type != FieldType::File {
                return Err(SessionError::NotAFileField(field_id.to_string()));
            }
            inner.epoch
        };

        let result = self
            .transport
            .upload_file(&self.version.id, field_id, upload)
            .await;

        let mut inner = self.lock("completing upload")?;
        if inner.epoch != epoch {
            debug!(field = field_id, "discarding upload response after reset");
            return Err(SessionError::Discarded);
        }
        match result {
            Ok(uploaded) => {
                // a submission started meanwhile; the file is not part of it
                if let Err(refused) = inner.ensure_editable() {
                    warn!(field = field_id, state = ?inner.state, "upload finished after submit started");
                    return Err(refused);
                }
                self.apply_value(&mut inner, field_id, uploaded.to_value());
                self.publish(&inner);
                Ok(uploaded)
            }
            Err(err) => {
                warn!(field = field_id, error = %err, "upload failed");
                inner
                    .errors
                    .insert(field_id, FieldError::upload(err.to_string()));
                self.publish(&inner);
                Err(SessionError::from(err))
            }
        }
    }
}

/// Moves the session to `Failed` when a submit future is dropped while its
/// request is in flight. The snapshot is kept.
struct SubmitGuard<'a> {
    session: &'a FormSession,
    epoch: u64,
    armed: bool,
}

impl<'a> SubmitGuard<'a> {
    fn new(session: &'a FormSession, epoch: u64) -> Self {
        SubmitGuard {
            session,
            epoch,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut inner) = self.session.inner.lock() else {
            return;
        };
        if inner.epoch != self.epoch || inner.state != SessionState::Submitting {
            return;
        }
        warn!(version = %self.session.version.id, "submission abandoned before a response");
        inner.failure = Some(SUBMIT_ABANDONED.to_string());
        inner.transition(SessionState::Failed);
        self.session.publish(&inner);
    }
}
