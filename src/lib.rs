//! hvfleet - Device state supervisor for high-voltage power-supply fleets.
//!
//! hvfleet supervises a fleet of multi-channel high-voltage boards biasing
//! a detector's sensor layers. It keeps a TTL-refreshed persistent mirror
//! of each channel's live parameters, reconciles a declarative board
//! configuration against live hardware at startup and teardown, computes
//! per-layer voltage targets and ramp speeds from a default-voltage
//! profile, and dispatches JSON "tickets" against that state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Ticket Dispatcher                          │
//! │          Down │ SetVoltage │ GetParams  →  JSON envelope        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Supervisor                              │
//! │   Device Directory │ Refresh Policy │ Voltage/Ramp Controller   │
//! └─────────────────────────────────────────────────────────────────┘
//!                    │                          │
//! ┌──────────────────────────────┐ ┌────────────────────────────────┐
//! │     Parameter Cache Store    │ │       Hardware Adapter         │
//! │  boards │ channels │ params  │ │  init │ deinit │ read │ write  │
//! └──────────────────────────────┘ └────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::time`] - Timestamps and the injectable clock
//! - [`core::error`] - Error types
//!
//! ## Supervisor
//! - [`supervisor::directory`] - Board reconciliation and teardown
//! - [`supervisor::refresh`] - TTL read-through and write-through cache
//! - [`supervisor::controller`] - Layer-scaled voltage and ramp control
//! - [`supervisor::params`] - Canonical channel parameter names
//!
//! ## Storage
//! - [`store`] - Persistent board/channel parameter cache
//!
//! ## Hardware
//! - [`hw`] - Hardware adapter trait and the simulated fleet
//!
//! ## Tickets
//! - [`tickets`] - Typed command objects and the JSON envelope boundary
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - **Directory matches config**: after reconciliation the cached board
//!   set equals the configured set minus boards whose init failed
//! - **Bounded staleness**: returned parameters are at most one TTL old
//!   unless hardware is unreachable, in which case the fallback is flagged
//! - **Scaled ramps**: a layer's ramp speed is proportional to its default
//!   voltage, so layers reach their targets together
//! - **Envelope totality**: ticket execution always yields
//!   `{"status": bool, "body": {...}}`, never a raw error

// Core infrastructure
pub mod core;

// Persistent parameter cache
pub mod store;

// Hardware adapter and simulator
pub mod hw;

// Supervisor: directory, refresh policy, controller
pub mod supervisor;

// Ticket dispatch
pub mod tickets;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, time};
pub use store::{BoardRow, CacheStore, ChannelRow};
pub use supervisor::{ReconcileReport, Supervisor};
pub use tickets::{Ticket, TicketKind};
