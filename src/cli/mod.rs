//! Command-line interface.
//!
//! Unified CLI for hvfleet operations.

pub mod commands;

use clap::{Parser, Subcommand};

/// hvfleet - device state supervisor for high-voltage fleets.
#[derive(Parser, Debug)]
#[command(name = "hvfleet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// List ticket kinds and their required parameters.
    Tickets(commands::TicketsArgs),
    /// Execute a ticket against a simulated fleet.
    Exec(commands::ExecArgs),
}
