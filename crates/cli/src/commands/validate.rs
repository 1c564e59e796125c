use std::path::Path;
use std::process;

use formgate_eval::evaluate_form;

use crate::{load_schema, load_snapshot, print_json, OutputFormat};

/// Validate a set of values against the resolved field state.
///
/// Exits with status 1 when any visible field fails validation.
pub fn cmd_validate(schema_path: &Path, values: Option<&Path>, output: OutputFormat, quiet: bool) {
    let schema = load_schema(schema_path, output, quiet);
    let snapshot = load_snapshot(&schema, values, output, quiet);
    let evaluation = evaluate_form(&schema, &snapshot);
    let valid = evaluation.errors.is_empty();

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "valid": valid,
                "errors": evaluation.errors,
            });
            print_json(&result);
        }
        OutputFormat::Text => {
            if !quiet {
                if valid {
                    println!("Valid: {} visible fields", evaluation.state.visible_field_ids().len());
                } else {
                    for (field_id, error) in evaluation.errors.iter() {
                        println!("{}: {}", field_id, error.message);
                    }
                }
            }
        }
    }

    if !valid {
        process::exit(1);
    }
}
