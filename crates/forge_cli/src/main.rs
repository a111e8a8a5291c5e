//! Forge CLI — inspect and maintain the incremental content build cache.
//!
//! Provides `forge status` to report which assets need rebuilding,
//! `forge register` for build drivers to record a successful asset build,
//! `forge show` to list tracked entries, and `forge clear` to reset the cache.

#![warn(missing_docs)]

mod clear;
mod pipeline;
mod register;
mod show;
mod status;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use forge_common::BuildId;
use tracing_subscriber::EnvFilter;

/// Forge — incremental content builds for game assets.
#[derive(Parser, Debug)]
#[command(name = "forge", version, about = "Forge content build cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `forge.toml` file or the project directory holding it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report which content files need rebuilding.
    Status(StatusArgs),
    /// Record a successful build of one content file.
    Register(RegisterArgs),
    /// List every tracked cache entry.
    Show(ShowArgs),
    /// Forget all tracked build state.
    Clear,
}

/// Arguments for the `forge status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Exit with status 1 if anything needs rebuilding.
    #[arg(long)]
    pub check: bool,
}

/// Arguments for the `forge register` subcommand.
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// The content file that was built.
    pub input: PathBuf,

    /// A dependency reported by the importer (repeatable).
    #[arg(short, long = "dep")]
    pub deps: Vec<PathBuf>,

    /// Directory dependencies are relative to (default: the input's directory).
    #[arg(long)]
    pub import_dir: Option<PathBuf>,

    /// The build step emits code or assets consumed elsewhere.
    #[arg(long)]
    pub creates_user_content: bool,

    /// Also record generated code for this file in the ledger.
    #[arg(long)]
    pub generated: bool,

    /// Build identifier to stamp (default: the current build session).
    #[arg(long, conflicts_with = "new_session")]
    pub build_id: Option<BuildId>,

    /// Start a new build session instead of joining the current one.
    #[arg(long)]
    pub new_session: bool,
}

/// Arguments for the `forge show` subcommand.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a config file or project directory.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Status(ref args) => status::run(args, &global),
        Command::Register(ref args) => register::run(args, &global),
        Command::Show(ref args) => show::run(args, &global),
        Command::Clear => clear::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the log subscriber.
///
/// `RUST_LOG` wins; then `--verbose` / `--quiet`; then the project's
/// `[log] level` if a project can be found.
fn init_tracing(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_level(global: &GlobalArgs) -> String {
    if global.verbose {
        return "debug".to_string();
    }
    if global.quiet {
        return "error".to_string();
    }
    pipeline::load_project(global)
        .map(|project| project.config.log.level)
        .unwrap_or_else(|_| "warn".to_string())
}
