//! formgate field state and validation engine -- takes a form schema and
//! a value snapshot, produces visibility, required flags, validation
//! errors and the submission payload.
//!
//! Everything here is synchronous and pure. The session controller calls
//! [`evaluate_form`] after every edit and [`prepare_submission`] on submit;
//! neither keeps any state between calls.

pub mod condition;
pub mod numeric;
pub mod payload;
pub mod resolve;
pub mod validate;
pub mod values;

pub use payload::{build_payload, SubmissionPayload};
pub use resolve::{resolve, FieldState};
pub use validate::{validate, FieldError, FieldErrorKind, ValidationErrors};
pub use values::ValueSnapshot;

use formgate_schema::FormSchema;
use serde::Serialize;
use tracing::debug;

/// Field state and validation errors for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormEvaluation {
    pub state: FieldState,
    pub errors: ValidationErrors,
}

/// Resolve field state and validate the snapshot against it.
///
/// # Arguments
/// * `schema` - The loaded form schema
/// * `snapshot` - Current field values
pub fn evaluate_form(schema: &FormSchema, snapshot: &ValueSnapshot) -> FormEvaluation {
    let state = resolve(schema, snapshot);
    let errors = validate(snapshot, &state, schema.fields());
    FormEvaluation { state, errors }
}

/// Validate the snapshot and, if it is valid, build the payload over the
/// visible fields.
///
/// # Returns
/// * The payload, or every validation error when any field fails
pub fn prepare_submission(
    schema: &FormSchema,
    snapshot: &ValueSnapshot,
) -> Result<SubmissionPayload, ValidationErrors> {
    let FormEvaluation { state, errors } = evaluate_form(schema, snapshot);
    if !errors.is_empty() {
        debug!(errors = errors.len(), "submission blocked by validation");
        return Err(errors);
    }
    Ok(build_payload(snapshot, state.visible_field_ids()))
}
