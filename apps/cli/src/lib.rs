//! # sanbill-cli
//!
//! Command-line host for Sanbill.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (clap)   --help/--version ► exit 0, bad usage ► 2   │
//! │  2. calc?                    answer without touching the database       │
//! │  3. Load configuration       defaults → config.toml → env → --db        │
//! │  4. Install tracing          stderr, RUST_LOG or SANBILL_LOG            │
//! │  5. Open the database        migrations run on open (failure ► exit 3)  │
//! │  6. Execute the command      output on stdout                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod args;
pub mod commands;
pub mod config;
pub mod error;

use clap::Parser;
use sanbill_db::{Database, DbConfig};
use std::ffi::OsString;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;
use crate::commands::Context;
use crate::config::AppConfig;
use crate::error::{CliError, CliResult, EXIT_USAGE};

/// Installs the stderr tracing subscriber.
///
/// `RUST_LOG` wins over `filter` when set. A second call is a no-op.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn open_database(config: &AppConfig) -> CliResult<Database> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!(path = %config.database_path.display(), "Database opened");
    Ok(db)
}

async fn try_run(cli: Cli) -> CliResult<String> {
    if !cli.command.needs_database() {
        return commands::execute_offline(&cli.command);
    }

    let config = AppConfig::load(cli.config.as_deref(), cli.db)?;
    init_tracing(&config.log_filter);
    debug!(?config, "Configuration loaded");

    let db = open_database(&config).await?;
    let ctx = Context { db, config };

    let result = commands::execute(cli.command, &ctx).await;
    ctx.db.close().await;
    result
}

/// Runs one invocation and maps the outcome to an exit code.
///
/// `args` includes the program name, as `std::env::args_os()` yields it.
pub async fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too, with exit code 0.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match try_run(cli).await {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
