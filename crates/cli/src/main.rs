mod commands;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use formgate_eval::ValueSnapshot;
use formgate_schema::FormSchema;
use formgate_transport::{ConfigError, TransportConfig};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Schema-driven form engine.
#[derive(Parser)]
#[command(name = "formgate", version, about = "Schema-driven form engine")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where to reach the form API.
#[derive(Args, Debug, Clone)]
pub(crate) struct RemoteArgs {
    /// TOML file with base_url, auth_token and timeout_secs (overrides the environment)
    #[arg(long)]
    config: Option<PathBuf>,
    /// API base URL (overrides both the config file and the environment)
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve field visibility and required flags for a set of values
    Resolve {
        /// Path to a schema or form version JSON file
        schema: PathBuf,
        /// Path to a JSON object of field values (defaults when omitted)
        #[arg(long)]
        values: Option<PathBuf>,
    },

    /// Validate a set of values; exits 1 when any field is invalid
    Validate {
        /// Path to a schema or form version JSON file
        schema: PathBuf,
        /// Path to a JSON object of field values (defaults when omitted)
        #[arg(long)]
        values: Option<PathBuf>,
    },

    /// Print the submission payload for a set of values
    Payload {
        /// Path to a schema or form version JSON file
        schema: PathBuf,
        /// Path to a JSON object of field values (defaults when omitted)
        #[arg(long)]
        values: Option<PathBuf>,
        /// Build the payload even when validation fails
        #[arg(long)]
        no_validate: bool,
    },

    /// Fetch a form version from the API
    Fetch {
        /// Form version id
        version_id: String,
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Fill a form version with values and submit it
    Submit {
        /// Form version id
        version_id: String,
        /// Path to a JSON object of field values
        #[arg(long)]
        values: PathBuf,
        /// Submitting user's id, sent as user_id
        #[arg(long)]
        user_id: Option<String>,
        /// Drop values of fields hidden by later edits
        #[arg(long)]
        clear_hidden: bool,
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Resolve { schema, values } => {
            commands::resolve::cmd_resolve(&schema, values.as_deref(), cli.output, cli.quiet);
        }
        Commands::Validate { schema, values } => {
            commands::validate::cmd_validate(&schema, values.as_deref(), cli.output, cli.quiet);
        }
        Commands::Payload {
            schema,
            values,
            no_validate,
        } => {
            commands::payload::cmd_payload(
                &schema,
                values.as_deref(),
                no_validate,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Fetch { version_id, remote } => {
            commands::fetch::cmd_fetch(&version_id, &remote, cli.output, cli.quiet);
        }
        Commands::Submit {
            version_id,
            values,
            user_id,
            clear_hidden,
            remote,
        } => {
            commands::submit::cmd_submit(
                &version_id,
                &values,
                user_id.as_deref(),
                clear_hidden,
                &remote,
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Logs go to stderr so stdout stays machine readable. `RUST_LOG`
/// overrides the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ──────────────────────────────────────────────
// Shared helpers
// ──────────────────────────────────────────────

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report `msg` and exit with status 1.
pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

pub(crate) fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("serialization error: {}", e),
    }
}

pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("error reading file '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => fail(
            &format!("error parsing JSON in '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    }
}

/// Load a bare schema or a full (optionally `data`-wrapped) form version.
pub(crate) fn load_schema(path: &Path, output: OutputFormat, quiet: bool) -> FormSchema {
    let doc = read_json(path, output, quiet);
    let body = match doc.get("data") {
        Some(data) if data.is_object() => data,
        _ => &doc,
    };
    let loaded = if body.get("schema").is_some() {
        formgate_schema::FormVersion::from_json(&doc).map(|v| v.schema)
    } else {
        FormSchema::from_json(&doc)
    };
    match loaded {
        Ok(schema) => schema,
        Err(e) => fail(
            &format!("error: invalid schema in '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    }
}

/// Field values from a JSON object file.
pub(crate) fn read_values(
    path: &Path,
    output: OutputFormat,
    quiet: bool,
) -> serde_json::Map<String, serde_json::Value> {
    match read_json(path, output, quiet) {
        serde_json::Value::Object(map) => map,
        _ => fail(
            &format!("error: values file '{}' must contain a JSON object", path.display()),
            output,
            quiet,
        ),
    }
}

/// Schema defaults overlaid with the values file, if any.
pub(crate) fn load_snapshot(
    schema: &FormSchema,
    values: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> ValueSnapshot {
    let mut snapshot = ValueSnapshot::from_defaults(schema);
    if let Some(path) = values {
        for (id, value) in read_values(path, output, quiet) {
            if schema.field(&id).is_none() {
                warn!(field = %id, "value for unknown field");
            }
            snapshot.insert(id, value);
        }
    }
    snapshot
}

/// `--config` wins over the environment; `--base-url` wins over both.
pub(crate) fn transport_config(remote: &RemoteArgs) -> Result<TransportConfig, ConfigError> {
    let mut config = match (&remote.config, &remote.base_url) {
        (Some(path), _) => TransportConfig::load(path)?,
        (None, Some(url)) => match TransportConfig::from_env() {
            Ok(config) => config,
            Err(ConfigError::MissingBaseUrl) => TransportConfig::new(url.clone()),
            Err(e) => return Err(e),
        },
        (None, None) => TransportConfig::from_env()?,
    };
    if let Some(url) = &remote.base_url {
        config.base_url = url.clone();
    }
    Ok(config)
}
