use std::path::Path;
use std::process;

use formgate_eval::{build_payload, prepare_submission, resolve};

use crate::{load_schema, load_snapshot, print_json, report_error, OutputFormat};

/// Print the payload that would be submitted: visible fields only, missing
/// values as `null`.
pub fn cmd_payload(
    schema_path: &Path,
    values: Option<&Path>,
    no_validate: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let schema = load_schema(schema_path, output, quiet);
    let snapshot = load_snapshot(&schema, values, output, quiet);

    let payload = if no_validate {
        let state = resolve(&schema, &snapshot);
        build_payload(&snapshot, state.visible_field_ids())
    } else {
        match prepare_submission(&schema, &snapshot) {
            Ok(payload) => payload,
            Err(errors) => {
                match output {
                    OutputFormat::Json => {
                        if !quiet {
                            eprintln!(
                                "{}",
                                serde_json::json!({
                                    "error": "validation failed",
                                    "errors": errors,
                                })
                            );
                        }
                    }
                    OutputFormat::Text => {
                        report_error("validation failed:", output, quiet);
                        for (field_id, error) in errors.iter() {
                            report_error(&format!("  {}: {}", field_id, error.message), output, quiet);
                        }
                    }
                }
                process::exit(1);
            }
        }
    };

    // the payload is data in either format
    print_json(&payload);
}
