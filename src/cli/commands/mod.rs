//! CLI command implementations.

mod config;
mod exec;
mod tickets;

pub use config::{run_config, ConfigArgs};
pub use exec::{run_exec, ExecArgs};
pub use tickets::{run_tickets, TicketsArgs};
