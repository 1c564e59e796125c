use std::path::Path;

use formgate_eval::resolve;

use crate::{load_schema, load_snapshot, print_json, OutputFormat};

/// Resolve visibility and required flags and print them per field.
pub fn cmd_resolve(schema_path: &Path, values: Option<&Path>, output: OutputFormat, quiet: bool) {
    let schema = load_schema(schema_path, output, quiet);
    let snapshot = load_snapshot(&schema, values, output, quiet);
    let state = resolve(&schema, &snapshot);

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "visibility": state.visibility,
                "required": state.required,
                "visible_fields": state.visible_field_ids(),
                "hidden_fields": state.hidden_field_ids(),
            });
            print_json(&result);
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            for field in schema.fields() {
                let visibility = if state.is_visible(&field.id) {
                    "visible"
                } else {
                    "hidden"
                };
                let required = if state.is_required(&field.id) {
                    ", required"
                } else {
                    ""
                };
                println!("{}: {}{}", field.id, visibility, required);
            }
        }
    }
}
