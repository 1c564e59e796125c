use std::path::Path;
use std::process;
use std::sync::Arc;

use formgate_schema::VersionId;
use formgate_session::{
    FormSession, HiddenValuePolicy, SchemaLoader, SessionError, SessionOptions, SubmitOutcome,
};
use formgate_transport::{FormTransport, HttpTransport, SubmitterId};
use tracing::warn;

use crate::{fail, print_json, read_values, report_error, transport_config, OutputFormat, RemoteArgs};

/// Load a form version, enter the values one by one as a user would, and
/// submit. Exits with status 1 unless the server accepts the submission.
pub fn cmd_submit(
    version_id: &str,
    values_path: &Path,
    user_id: Option<&str>,
    clear_hidden: bool,
    remote: &RemoteArgs,
    output: OutputFormat,
    quiet: bool,
) {
    let config = match transport_config(remote) {
        Ok(c) => c,
        Err(e) => fail(&format!("error: {}", e), output, quiet),
    };
    let values = read_values(values_path, output, quiet);

    let mut options = SessionOptions::default();
    if let Some(id) = user_id {
        options = options.with_submitter(SubmitterId::from(id));
    }
    if clear_hidden {
        options = options.with_hidden_values(HiddenValuePolicy::ClearOnHide);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(&format!("error: failed to start runtime: {}", e), output, quiet),
    };
    let outcome = rt.block_on(async {
        let transport: Arc<dyn FormTransport> = Arc::new(HttpTransport::new(config));
        let loader = SchemaLoader::new();
        let session =
            FormSession::open(transport, &loader, &VersionId::new(version_id), options).await?;
        for (field_id, value) in values {
            match session.set_field_value(&field_id, value) {
                Ok(()) => {}
                Err(SessionError::UnknownField(id)) => {
                    warn!(field = %id, "skipping value for unknown field");
                }
                Err(e) => return Err(e),
            }
        }
        session.submit().await
    });

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => fail(&format!("error: {}", e), output, quiet),
    };

    match outcome {
        SubmitOutcome::Submitted(result) => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "submitted": true,
                "submission_id": result.submission_id,
                "message": result.message,
            })),
            OutputFormat::Text => {
                if !quiet {
                    match &result.submission_id {
                        Some(id) => println!("Submitted (id {})", id),
                        None => println!("Submitted"),
                    }
                    if let Some(message) = &result.message {
                        println!("{}", message);
                    }
                }
            }
        },
        SubmitOutcome::Invalid(errors) | SubmitOutcome::Rejected(errors) => {
            match output {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "submitted": false,
                    "errors": errors,
                })),
                OutputFormat::Text => {
                    report_error("submission not accepted:", output, quiet);
                    for (field_id, error) in errors.iter() {
                        report_error(&format!("  {}: {}", field_id, error.message), output, quiet);
                    }
                }
            }
            process::exit(1);
        }
        SubmitOutcome::Failed(message) => fail(&format!("error: {}", message), output, quiet),
        SubmitOutcome::Discarded => fail("error: submission discarded", output, quiet),
    }
}
