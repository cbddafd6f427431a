//! Binary entry point for the tuginspect CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a scripted editor session and print every frame
//! tuginspect replay session.json
//!
//! # Show the effective configuration
//! tuginspect config --project .
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tuginspect::config::Config;
use tuginspect::error::{InspectError, InspectResult, OutputErrorCode};
use tuginspect::output::{emit_response, ConfigResponse, ErrorResponse, ReplayResponse};
use tuginspect::replay::{run_script, ReplayScript};

// ============================================================================
// CLI Structure
// ============================================================================

/// Incremental AI inspection cache and renderer reconciliation.
///
/// All output is JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "tuginspect", version, about = "Incremental AI inspection cache")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Configuration file (default: .tuginspect/config.toml under --project).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project root used to find the configuration (default: current directory).
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted editor session against an in-memory editor.
    Replay {
        /// Path to the replay script (JSON).
        script: PathBuf,
    },
    /// Show the effective configuration.
    Config,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn execute(cli: Cli) -> InspectResult<()> {
    match cli.command {
        Command::Replay { script } => execute_replay(&cli.global, &script).await,
        Command::Config => execute_config(&cli.global),
    }
}

// ============================================================================
// Command Executors
// ============================================================================

/// Resolve the configuration and where it came from.
fn load_config(global: &GlobalArgs) -> InspectResult<(Config, Option<PathBuf>)> {
    if let Some(path) = &global.config {
        return Ok((Config::load(path)?, Some(path.clone())));
    }
    let root = match &global.project {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let path = Config::project_path(&root);
    let source = path.exists().then_some(path);
    Ok((Config::load_from_project(&root)?, source))
}

async fn execute_replay(global: &GlobalArgs, script_path: &Path) -> InspectResult<()> {
    let (config, _) = load_config(global)?;
    let script = ReplayScript::load(script_path)?;
    tracing::info!(
        "replaying {} ({} steps)",
        script_path.display(),
        script.steps.len()
    );

    let frames = run_script(&script, &config.inspection).await?;
    let response = ReplayResponse::new(script_path.display().to_string(), frames);
    emit(&response)
}

fn execute_config(global: &GlobalArgs) -> InspectResult<()> {
    let (config, source) = load_config(global)?;
    let response = ConfigResponse::new(source.map(|p| p.display().to_string()), config);
    emit(&response)
}

fn emit<T: serde::Serialize>(response: &T) -> InspectResult<()> {
    emit_response(response, &mut io::stdout()).map_err(|e| InspectError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
