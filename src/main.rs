//! hvfleet - unified CLI entrypoint.
//!
//! Usage:
//!   hvfleet config validate --config config/hvfleet.json
//!   hvfleet config show --config config/hvfleet.json
//!   hvfleet tickets [--json]
//!   hvfleet exec '{"name": "GetParams", "params": {"select_params": null}}'

use anyhow::Result;
use clap::Parser;
use hvfleet::cli::commands::{run_config, run_exec, run_tickets};
use hvfleet::cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Config(args) => run_config(args),
        Commands::Tickets(args) => run_tickets(args),
        Commands::Exec(args) => run_exec(args),
    }
}
