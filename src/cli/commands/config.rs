//! Config command implementation.

use crate::core::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file.
    Validate {
        /// Config file path.
        #[arg(short, long, default_value = "config/hvfleet.json")]
        config: PathBuf,
    },
    /// Print a configuration with defaults applied.
    Show {
        /// Config file path.
        #[arg(short, long, default_value = "config/hvfleet.json")]
        config: PathBuf,
    },
}

/// Run the config command.
pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Validate { config } => validate_config(&config),
        ConfigCommand::Show { config } => show_config(&config),
    }
}

fn validate_config(path: &PathBuf) -> Result<()> {
    let config = Config::from_file(path)?;
    let specs = config.board_specs()?;
    let channels: usize = specs.iter().map(|board| board.channels.len()).sum();
    println!("✓ Config file is valid");
    println!("  boards: {}", specs.len());
    println!("  channels: {channels}");
    Ok(())
}

fn show_config(path: &PathBuf) -> Result<()> {
    let config = Config::from_file(path)?;
    let rendered =
        serde_json::to_string_pretty(&config).context("failed to render config as JSON")?;
    println!("{rendered}");
    Ok(())
}
