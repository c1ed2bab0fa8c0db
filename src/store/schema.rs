//! redb table definitions and row types for the parameter cache store.
//!
//! Both tables use `&str` keys and `&[u8]` values (JSON-serialized rows).
//! Channel keys are composite: `{board_address}:{channel:03}`, so one
//! board's channels occupy a contiguous, prefix-scannable key range.

use crate::core::time::Timestamp;
use redb::TableDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Board rows keyed by board address.
pub const BOARDS: TableDefinition<&str, &[u8]> = TableDefinition::new("boards");

/// Channel rows keyed by `{board_address}:{channel:03}`.
pub const CHANNELS: TableDefinition<&str, &[u8]> = TableDefinition::new("channels");

/// Composite key for a channel row.
pub fn channel_key(address: &str, channel: u16) -> String {
    format!("{address}:{channel:03}")
}

/// Key prefix covering all channels of one board.
pub fn channel_prefix(address: &str) -> String {
    format!("{address}:")
}

/// One cached board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRow {
    /// Unique board address.
    pub address: String,

    /// Conet number of the physical bus path.
    pub conet: i64,

    /// Link number of the physical bus path.
    pub link: i64,

    /// Live session handle from the hardware adapter; `None` means the
    /// board is not currently initialized and is removable.
    pub handle: Option<i64>,
}

/// One cached channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRow {
    /// Address of the owning board.
    pub board_address: String,

    /// Channel number on its board.
    pub channel: u16,

    /// Human-readable label. Informational only.
    pub alias: String,

    /// Layer grouping key; `None` for the ungrouped sentinel.
    pub layer: Option<i64>,

    /// Time of the most recent successful hardware read; `None` if the
    /// channel has never been read.
    pub last_update: Option<Timestamp>,

    /// Cached named parameter values.
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl ChannelRow {
    /// The store key for this row.
    pub fn key(&self) -> String {
        channel_key(&self.board_address, self.channel)
    }
}
