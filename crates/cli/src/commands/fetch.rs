use formgate_schema::VersionId;
use formgate_session::SchemaLoader;
use formgate_transport::HttpTransport;

use crate::{fail, print_json, transport_config, OutputFormat, RemoteArgs};

/// Fetch a form version and print it.
pub fn cmd_fetch(version_id: &str, remote: &RemoteArgs, output: OutputFormat, quiet: bool) {
    let config = match transport_config(remote) {
        Ok(c) => c,
        Err(e) => fail(&format!("error: {}", e), output, quiet),
    };
    let transport = HttpTransport::new(config);
    let loader = SchemaLoader::new();
    let version_id = VersionId::new(version_id);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(&format!("error: failed to start runtime: {}", e), output, quiet),
    };
    let version = match rt.block_on(loader.load(&transport, &version_id)) {
        Ok(v) => v,
        Err(e) => fail(&format!("error: {}", e), output, quiet),
    };

    match output {
        OutputFormat::Json => print_json(&version),
        OutputFormat::Text => {
            if quiet {
                return;
            }
            let title = version
                .schema
                .ui_settings
                .form_title
                .as_deref()
                .unwrap_or("(untitled)");
            println!("{} [{}]", title, version.id);
            for section in &version.schema.sections {
                println!("  {} ({} fields)", section.title, section.fields.len());
                for field in &section.fields {
                    println!("    {} {} \"{}\"", field.id, field.field_type.as_str(), field.label);
                }
            }
            println!(
                "{} fields, {} rules, submit: \"{}\"",
                version.schema.field_count(),
                version.schema.rule_count(),
                version.config.submit_button_text()
            );
        }
    }
}
