//! # mandi CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Verbosity maps to the tracing filter; handler errors print through
//! tracing and exit non-zero.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mandi_cli::demo::{run_demo, DemoArgs};
use mandi_cli::gst::{run_gst, GstArgs};
use mandi_cli::show::{run_show, ShowArgs};
use mandi_cli::sweep::{run_sweep, SweepArgs};

/// Mandi trade core CLI
///
/// Operational tooling for the match / negotiation / trade pipeline:
/// in-memory demo scenarios, negotiation expiry sweeps, database
/// inspection, and GST calculations.
#[derive(Parser, Debug)]
#[command(name = "mandi", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted match-to-contract scenario against the in-memory store.
    Demo(DemoArgs),

    /// Expire every live negotiation whose response window has passed.
    Sweep(SweepArgs),

    /// Inspect negotiations and trades stored in the database.
    Show(ShowArgs),

    /// Compute a GST breakdown for a taxable amount and a state pair.
    Gst(GstArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Demo(args) => run_demo(&args).await,
        Commands::Sweep(args) => run_sweep(&args).await,
        Commands::Show(args) => run_show(&args).await,
        Commands::Gst(args) => run_gst(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
