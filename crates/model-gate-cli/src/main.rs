// crates/model-gate-cli/src/main.rs
// ============================================================================
// Module: Model Gate CLI Entry Point
// Description: Command dispatcher for artifact verification and registry tasks.
// Purpose: Verify model artifacts locally or from storage and inspect results.
// Dependencies: clap, model-gate-config, model-gate-core, model-gate-service.
// ============================================================================

//! ## Overview
//! The `model-gate` binary runs the verification service against a local
//! file, an S3 object, or a recorded storage notification, and offers
//! configuration and registry utilities. All user-facing strings are routed
//! through the message catalog. Exit status is 0 for an admitted artifact,
//! 2 for a rejected one, and 1 when the command itself fails.
//!
//! Security posture: artifacts and event files are untrusted; event input is
//! size-limited before it is decoded.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use model_gate_cli::t;
use model_gate_config::ModelGateConfig;
use model_gate_config::S3StorageConfig;
use model_gate_config::StorageConfig;
use model_gate_core::ArtifactLocation;
use model_gate_service::FsArtifactSource;
use model_gate_service::S3ArtifactSource;
use model_gate_service::VerificationOutcome;
use model_gate_service::VerifyService;
use model_gate_service::event::MAX_EVENT_BYTES;
use model_gate_store_sqlite::SqliteVerificationSink;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Bucket label recorded for artifacts verified from the local filesystem.
const LOCAL_BUCKET: &str = "local";
/// Exit status reported when verification rejects the artifact.
const REJECTED_EXIT_STATUS: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "model-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Optional config file path (defaults to model-gate.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify a local artifact file.
    Verify(VerifyCommand),
    /// Verify an object stored in S3.
    #[command(name = "verify-s3")]
    VerifyS3(VerifyS3Command),
    /// Replay a storage notification through the configured source.
    Event(EventCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Results registry utilities.
    Registry {
        /// Selected registry subcommand.
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
struct VerifyCommand {
    /// Path to the artifact file.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Output format for the verification outcome.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `verify-s3`.
#[derive(Args, Debug)]
struct VerifyS3Command {
    /// Bucket holding the artifact.
    #[arg(long, value_name = "BUCKET")]
    bucket: String,
    /// Object key of the artifact.
    #[arg(long, value_name = "KEY")]
    key: String,
    /// Declared object size in bytes (retrieval still enforces the limit).
    #[arg(long, value_name = "BYTES")]
    size: Option<u64>,
    /// Output format for the verification outcome.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Arguments for `event`.
#[derive(Args, Debug)]
struct EventCommand {
    /// Path to the storage notification JSON file.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Output format for the verification outcome.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
    /// Print the effective configuration as TOML.
    Show,
}

/// Registry subcommands.
#[derive(Subcommand, Debug)]
enum RegistryCommand {
    /// Print the stored registry record for a model.
    Get(RegistryGetCommand),
}

/// Arguments for `registry get`.
#[derive(Args, Debug)]
struct RegistryGetCommand {
    /// Model identifier.
    #[arg(value_name = "MODEL_ID")]
    model_id: String,
}

/// Output formats for verification outcomes.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum OutputFormat {
    /// Pretty-printed JSON output.
    Json,
    /// Human-readable check summary.
    Text,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a rendered message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config_path = cli.config.as_deref();
    match command {
        Commands::Verify(command) => command_verify(&command, config_path),
        Commands::VerifyS3(command) => command_verify_s3(&command, config_path),
        Commands::Event(command) => command_event(&command, config_path),
        Commands::Config {
            command,
        } => command_config(&command, config_path),
        Commands::Registry {
            command,
        } => command_registry(&command, config_path),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Loads configuration, defaulting when no file is present.
fn load_config(path: Option<&Path>) -> CliResult<ModelGateConfig> {
    ModelGateConfig::load_or_default(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

// ============================================================================
// SECTION: Verify Commands
// ============================================================================

/// Executes `verify`.
fn command_verify(command: &VerifyCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let (root, location) = local_location(&command.path)?;
    let service =
        VerifyService::from_config_with_source(&config, Arc::new(FsArtifactSource::new(root)))
            .map_err(|err| CliError::new(t!("service.init_failed", error = err)))?;
    let outcome = service.handle_location(&location);
    emit_outcome(&outcome, command.format)
}

/// Executes `verify-s3`.
fn command_verify_s3(command: &VerifyS3Command, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let storage = match &config.storage {
        StorageConfig::S3(storage) => storage.clone(),
        StorageConfig::Filesystem(_) => S3StorageConfig::default(),
    };
    let source = S3ArtifactSource::new(&storage)
        .map_err(|err| CliError::new(t!("service.init_failed", error = err)))?;
    let service = VerifyService::from_config_with_source(&config, Arc::new(source))
        .map_err(|err| CliError::new(t!("service.init_failed", error = err)))?;
    let outcome = service.handle_location(&ArtifactLocation {
        bucket: command.bucket.clone(),
        key: command.key.clone(),
        declared_size: command.size.unwrap_or(0),
    });
    emit_outcome(&outcome, command.format)
}

/// Executes `event`.
fn command_event(command: &EventCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let path_label = command.path.display().to_string();
    let bytes = read_bytes_with_limit(&command.path, MAX_EVENT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(t!("event.read_failed", path = path_label, error = err))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!("event.too_large", path = path_label, size = size, limit = limit)),
    })?;
    let payload = String::from_utf8(bytes)
        .map_err(|_| CliError::new(t!("event.not_utf8", path = path_label)))?;
    let service = VerifyService::from_config(&config)
        .map_err(|err| CliError::new(t!("service.init_failed", error = err)))?;
    let outcome = service.handle_event(&payload);
    emit_outcome(&outcome, command.format)
}

/// Splits a local artifact path into a storage root and a location.
fn local_location(path: &Path) -> CliResult<(PathBuf, ArtifactLocation)> {
    let path_label = path.display().to_string();
    let metadata = fs::metadata(path).map_err(|err| {
        CliError::new(t!("verify.inspect_failed", path = path_label, error = err))
    })?;
    if !metadata.is_file() {
        return Err(CliError::new(t!("verify.path.invalid", path = path_label)));
    }
    let Some(name) = path.file_name().and_then(OsStr::to_str) else {
        return Err(CliError::new(t!("verify.path.invalid", path = path_label)));
    };
    let root = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((
        root,
        ArtifactLocation {
            bucket: LOCAL_BUCKET.to_string(),
            key: name.to_string(),
            declared_size: metadata.len(),
        },
    ))
}

/// Writes the outcome in the requested format and maps the verdict to an exit code.
fn emit_outcome(outcome: &VerificationOutcome, format: OutputFormat) -> CliResult<ExitCode> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(outcome)
            .map_err(|err| CliError::new(t!("verify.render_failed", error = err)))?,
        OutputFormat::Text => render_outcome_text(outcome),
    };
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::from(verdict_exit_status(outcome.is_verified())))
}

/// Returns the process exit status for a verdict.
const fn verdict_exit_status(verified: bool) -> u8 {
    if verified { 0 } else { REJECTED_EXIT_STATUS }
}

/// Renders a human-readable summary of an outcome.
fn render_outcome_text(outcome: &VerificationOutcome) -> String {
    let report = &outcome.report;
    let mut lines = vec![t!(
        "verify.text.header",
        model_id = report.model_id,
        status = outcome.status.as_str(),
        elapsed = report.execution_time_ms
    )];
    for (name, check) in &report.checks {
        let line = match (check.passed, &check.error, &check.warning) {
            (false, error, _) => {
                t!("verify.text.failed", name = name, message = error.as_deref().unwrap_or(""))
            }
            (true, _, Some(warning)) => t!("verify.text.warning", name = name, message = warning),
            (true, _, None) => t!("verify.text.passed", name = name),
        };
        lines.push(line);
    }
    lines.join("\n")
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    match command {
        ConfigCommand::Validate => {
            write_stdout_line(&t!("config.validate.ok"))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ConfigCommand::Show => {
            let rendered = config
                .to_toml()
                .map_err(|err| CliError::new(t!("config.show.failed", error = err)))?;
            write_stdout_line(rendered.trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Registry Commands
// ============================================================================

/// Dispatches registry subcommands.
fn command_registry(command: &RegistryCommand, config_path: Option<&Path>) -> CliResult<ExitCode> {
    match command {
        RegistryCommand::Get(command) => command_registry_get(command, config_path),
    }
}

/// Executes `registry get`.
fn command_registry_get(
    command: &RegistryGetCommand,
    config_path: Option<&Path>,
) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let Some(store_config) = config.registry.sqlite_config() else {
        return Err(CliError::new(t!("registry.not_sqlite")));
    };
    let store = SqliteVerificationSink::new(&store_config)
        .map_err(|err| CliError::new(t!("registry.open_failed", error = err)))?;
    let record = store
        .get_record(&command.model_id)
        .map_err(|err| CliError::new(t!("registry.get.failed", error = err)))?;
    let Some(record) = record else {
        return Err(CliError::new(t!("registry.get.not_found", model_id = command.model_id)));
    };
    let rendered = serde_json::to_string_pretty(&record)
        .map_err(|err| CliError::new(t!("registry.render_failed", error = err)))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Errors raised while reading size-limited inputs.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
