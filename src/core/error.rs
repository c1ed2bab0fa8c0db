//! Error types shared across the supervisor.
//!
//! The taxonomy follows the propagation policy of the system: configuration
//! errors are fatal at startup, hardware adapter errors are recovered close
//! to the call site that triggered them, ambiguous cache lookups are treated
//! as "not found", and validation errors surface only through the ticket
//! envelope boundary.

use thiserror::Error;

/// Common hvfleet error conditions.
#[derive(Debug, Error)]
pub enum HvError {
    /// Malformed or inconsistent configuration. Fatal at startup.
    #[error("config error: {message}")]
    Config { message: String },

    /// The hardware adapter rejected or failed an operation.
    #[error("hardware adapter failure: {message}")]
    Adapter { message: String },

    /// The board exists in the cache but has no live handle.
    #[error("board {address} is not live (no handle)")]
    BoardOffline { address: String },

    /// No cached board row matches the address.
    #[error("board {address} not found")]
    BoardNotFound { address: String },

    /// No cached channel row matches the (board, channel) pair.
    #[error("channel {channel} on board {address} not found")]
    ChannelNotFound { address: String, channel: u16 },

    /// Voltage multiplier outside the permitted [0, 1.2] range.
    #[error("voltage multiplier {value} outside [0, 1.2]")]
    MultiplierOutOfRange { value: f64 },

    /// A ticket is missing a required parameter key.
    #[error("ticket params missing required field '{field}'")]
    MissingField { field: String },

    /// A raw ticket string is not a well-formed ticket object.
    #[error("malformed ticket: {message}")]
    MalformedTicket { message: String },

    /// The ticket name does not match any known kind.
    #[error("unknown ticket kind '{name}'")]
    UnknownTicket { name: String },

    /// Persistent cache store failure.
    #[error("cache store error: {message}")]
    Store { message: String },
}

impl HvError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an Adapter error.
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
        }
    }

    /// Create a Store error.
    pub fn store(message: impl std::fmt::Display) -> Self {
        Self::Store {
            message: message.to_string(),
        }
    }

    /// Check if this error class is recovered locally rather than
    /// propagated past the call site (hardware flakiness policy).
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Adapter { .. } | Self::BoardOffline { .. })
    }

    /// Check if this error should be converted into a `status=false`
    /// ticket envelope rather than raised to the process boundary.
    pub fn is_ticket_visible(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}

/// Result type using HvError.
pub type HvResult<T> = Result<T, HvError>;

impl From<redb::DatabaseError> for HvError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::store(err)
    }
}

impl From<redb::TransactionError> for HvError {
    fn from(err: redb::TransactionError) -> Self {
        Self::store(err)
    }
}

impl From<redb::TableError> for HvError {
    fn from(err: redb::TableError) -> Self {
        Self::store(err)
    }
}

impl From<redb::StorageError> for HvError {
    fn from(err: redb::StorageError) -> Self {
        Self::store(err)
    }
}

impl From<redb::CommitError> for HvError {
    fn from(err: redb::CommitError) -> Self {
        Self::store(err)
    }
}

impl From<serde_json::Error> for HvError {
    fn from(err: serde_json::Error) -> Self {
        Self::store(err)
    }
}
