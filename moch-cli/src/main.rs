//! Moch CLI - command-line interface for the Moch pet-care data layer.
//!
//! Manages pets, care reminders, weight history and in-app preferences in the
//! local SQLite store. Useful for scripting, inspecting a database, and
//! watching change notifications while exercising the store.

mod commands;

use clap::{Parser, Subcommand};
use console::style;
use tracing::info;

use moch_core::config::MochConfig;
use moch_core::error::MochResult;
use moch_core::logging;

/// Moch - local-first pet care records.
#[derive(Parser)]
#[command(
    name = "moch",
    version,
    about = "Moch pet-care data CLI",
    long_about = "A command-line interface for the Moch pet-care store.\n\
                  Track pets, reminders and weight history in a local SQLite database."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Store(commands::StoreCommand),
    /// Open an interactive session and print change events as commands run.
    Watch {
        /// Only events related to this pet ID.
        #[arg(short, long)]
        pet: Option<String>,
        /// Only events about this kind of record.
        #[arg(short, long)]
        kind: Option<commands::watch::KindArg>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {e}", style("error:").red().bold());
        std::process::exit(1);
    }
}

async fn run() -> MochResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => MochConfig::load_from_file(std::path::Path::new(path))?,
        None => MochConfig::load_default()?,
    };

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let _guard = logging::init_logging(
        log_level,
        &config.effective_log_dir()?,
        config.logging.json_output,
    )?;

    info!("Moch CLI v{}", moch_core::constants::APP_VERSION);

    let session = commands::Session::open(&config)?;
    let result = match cli.command {
        Commands::Store(command) => commands::execute(&session, command, cli.format).await,
        Commands::Watch { pet, kind } => {
            commands::watch::run(&session, pet, kind, cli.format).await
        }
    };
    session.close()?;
    result
}
