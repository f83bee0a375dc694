//! CLI binary entry point for sheet-ingest

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use sheet_ingest::cli::commands::init::{InitArgs, handle_init};
#[cfg(feature = "cli")]
use sheet_ingest::cli::commands::query::{QueryArgs, handle_query};
#[cfg(feature = "cli")]
use sheet_ingest::cli::commands::run::{RunArgs, handle_run};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sheet-ingest")]
#[command(about = "Materialize sheet exports as relational tables")]
#[command(version)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Ingest every sheet in a directory
    Run {
        /// Directory holding the exported sheets
        input: PathBuf,
        /// Store backend (sqlite, postgres)
        #[arg(short, long)]
        backend: Option<String>,
        /// SQLite database path or PostgreSQL connection string
        #[arg(short, long)]
        database: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a sample .sheet-ingest.toml into a directory
    Init {
        /// Directory holding the exported sheets
        #[arg(default_value = ".")]
        input: PathBuf,
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Execute SQL against the store of a directory
    Query {
        /// SQL query to execute
        sql: String,
        /// Directory holding the exported sheets (default: current directory)
        #[arg(short, long, default_value = ".")]
        input: PathBuf,
        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        format: String,
        /// Store backend (sqlite, postgres)
        #[arg(short, long)]
        backend: Option<String>,
        /// SQLite database path or PostgreSQL connection string
        #[arg(short, long)]
        database: Option<String>,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            input,
            backend,
            database,
            json,
        } => {
            let args = RunArgs {
                input,
                backend,
                database,
                json,
            };
            let report = handle_run(&args)?;
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Init { input, force } => {
            handle_init(&InitArgs { input, force })?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Query {
            sql,
            input,
            format,
            backend,
            database,
        } => {
            let args = QueryArgs {
                sql,
                input,
                format,
                backend,
                database,
            };
            println!("{}", handle_query(&args)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
