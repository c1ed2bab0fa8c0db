//! Tickets command implementation.

use crate::tickets::TicketKind;
use anyhow::Result;
use clap::Args;

/// List ticket kinds with their parameter schemas.
#[derive(Args, Debug)]
pub struct TicketsArgs {
    /// Emit the listing as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Run the tickets command.
pub fn run_tickets(args: TicketsArgs) -> Result<()> {
    if args.json {
        let listing: Vec<serde_json::Value> = TicketKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "summary": kind.summary(),
                    "required_keys": kind.required_keys(),
                    "schema": kind.type_description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for kind in TicketKind::ALL {
        println!("{:<12} {}", kind.name(), kind.summary());
        let schema = kind.type_description();
        for (name, param) in &schema.params {
            match (param.min_value, param.max_value) {
                (Some(min), Some(max)) => {
                    println!("    {name} [{min}, {max}]: {}", param.description)
                }
                _ => println!("    {name}: {}", param.description),
            }
        }
    }
    Ok(())
}
