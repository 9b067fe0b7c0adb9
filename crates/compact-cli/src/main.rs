//! # compact CLI entry point
//!
//! Parses arguments, initialises logging and dispatches to the handlers
//! in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use compact_cli::inspect::{run_inspect, InspectArgs};
use compact_cli::rollback::{run_rollback, RollbackArgs};

/// Compact licensing core toolchain.
#[derive(Parser, Debug)]
#[command(name = "compact", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more (-v, -vv, -vvv). Ignored when
    /// RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Roll back a faulty license upload over a time window.
    Rollback(RollbackArgs),

    /// Print a provider's records and update history.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = match cli.command {
        Commands::Rollback(args) => run_rollback(&args),
        Commands::Inspect(args) => run_inspect(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
