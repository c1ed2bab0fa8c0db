//! Exec command implementation.
//!
//! Runs one ticket against a supervisor backed by the simulated fleet.
//! Useful for exercising a configuration end to end without hardware: the
//! directory is reconciled, the ticket executes, and the fleet is torn
//! down before the envelope is printed.

use crate::core::config::Config;
use crate::hw::sim::SimAdapter;
use crate::supervisor::Supervisor;
use crate::tickets::Ticket;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Execute a ticket against a simulated fleet.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Ticket request JSON, e.g. '{"name": "Down", "params": {}}'.
    pub ticket: String,

    /// Config file path.
    #[arg(short, long, default_value = "config/hvfleet.json")]
    pub config: PathBuf,
}

/// Run the exec command.
pub fn run_exec(args: ExecArgs) -> Result<()> {
    let config = Config::from_file(&args.config)?;
    let ticket = Ticket::from_json_str(&args.ticket).context("invalid ticket request")?;

    let (supervisor, report) = Supervisor::start(&config, Box::new(SimAdapter::new()))
        .context("failed to start supervisor")?;
    for failure in &report.failed {
        eprintln!("board {} failed to initialize: {}", failure.address, failure.error);
    }

    let envelope = ticket.execute(&supervisor);
    supervisor.teardown().context("teardown failed")?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
