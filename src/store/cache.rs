//! Transactional CRUD over the board/channel cache tables.
//!
//! The store holds data, not policy: staleness decisions and hardware
//! access live in the supervisor. Every public method is one short-lived
//! transaction. Deleting a board cascades to its channel rows inside the
//! same write transaction, so no orphaned channels can be observed.

use crate::core::error::{HvError, HvResult};
use crate::core::time::Timestamp;
use crate::store::schema::{channel_key, channel_prefix, BoardRow, ChannelRow, BOARDS, CHANNELS};
use redb::{Database, ReadableTable};
use std::collections::BTreeMap;
use std::path::Path;

/// Persistent parameter cache store.
pub struct CacheStore {
    db: Database,
}

impl CacheStore {
    /// Open (or create) the cache store at the given path.
    ///
    /// Both tables are created up front so later read transactions never
    /// observe a missing table.
    pub fn open(path: &Path) -> HvResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(HvError::store)?;
            }
        }
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        {
            txn.open_table(BOARDS)?;
            txn.open_table(CHANNELS)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// All cached boards, ordered by address.
    pub fn boards(&self) -> HvResult<Vec<BoardRow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOARDS)?;
        let mut rows = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Look up one board by address.
    pub fn board(&self, address: &str) -> HvResult<Option<BoardRow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BOARDS)?;
        match table.get(address)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a board row.
    pub fn upsert_board(&self, row: &BoardRow) -> HvResult<()> {
        let bytes = serde_json::to_vec(row)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BOARDS)?;
            table.insert(row.address.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Persist a new handle value for an existing board.
    pub fn set_board_handle(&self, address: &str, handle: Option<i64>) -> HvResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BOARDS)?;
            let mut row: BoardRow = match table.get(address)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => {
                    return Err(HvError::BoardNotFound {
                        address: address.to_string(),
                    })
                }
            };
            row.handle = handle;
            let bytes = serde_json::to_vec(&row)?;
            table.insert(address, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove one board and, in the same transaction, all of its channels.
    pub fn remove_board(&self, address: &str) -> HvResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut boards = txn.open_table(BOARDS)?;
            boards.remove(address)?;
            let mut channels = txn.open_table(CHANNELS)?;
            for key in Self::channel_keys_of(&channels, address)? {
                channels.remove(key.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove every board whose handle is unset, cascading to channels.
    ///
    /// Returns the number of boards removed.
    pub fn purge_unhandled_boards(&self) -> HvResult<usize> {
        let txn = self.db.begin_write()?;
        let removed;
        {
            let mut boards = txn.open_table(BOARDS)?;
            let mut dead = Vec::new();
            for entry in boards.iter()? {
                let (key, value) = entry?;
                let row: BoardRow = serde_json::from_slice(value.value())?;
                if row.handle.is_none() {
                    dead.push(key.value().to_string());
                }
            }
            let mut channels = txn.open_table(CHANNELS)?;
            for address in &dead {
                boards.remove(address.as_str())?;
                for key in Self::channel_keys_of(&channels, address)? {
                    channels.remove(key.as_str())?;
                }
            }
            removed = dead.len();
        }
        txn.commit()?;
        Ok(removed)
    }

    /// Replace a board's channel set with the given rows (drop-then-insert,
    /// one transaction).
    pub fn replace_channels(&self, address: &str, rows: &[ChannelRow]) -> HvResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut channels = txn.open_table(CHANNELS)?;
            for key in Self::channel_keys_of(&channels, address)? {
                channels.remove(key.as_str())?;
            }
            for row in rows {
                let bytes = serde_json::to_vec(row)?;
                channels.insert(row.key().as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// All cached channels joined with their boards, ordered by
    /// (board address, channel number).
    pub fn channels(&self) -> HvResult<Vec<(BoardRow, ChannelRow)>> {
        let txn = self.db.begin_read()?;
        let boards_table = txn.open_table(BOARDS)?;
        let mut boards = BTreeMap::new();
        for entry in boards_table.iter()? {
            let (key, value) = entry?;
            let row: BoardRow = serde_json::from_slice(value.value())?;
            boards.insert(key.value().to_string(), row);
        }

        let channels_table = txn.open_table(CHANNELS)?;
        let mut out = Vec::new();
        for entry in channels_table.iter()? {
            let (_, value) = entry?;
            let channel: ChannelRow = serde_json::from_slice(value.value())?;
            // A channel without a board is unreachable through the cascade
            // rules; skip rather than fail if one is ever observed.
            if let Some(board) = boards.get(&channel.board_address) {
                out.push((board.clone(), channel));
            }
        }
        Ok(out)
    }

    /// All cached channels in the given layer, joined with their boards.
    pub fn channels_by_layer(&self, layer: i64) -> HvResult<Vec<(BoardRow, ChannelRow)>> {
        let mut rows = self.channels()?;
        rows.retain(|(_, ch)| ch.layer == Some(layer));
        Ok(rows)
    }

    /// Look up one channel row.
    pub fn channel(&self, address: &str, channel: u16) -> HvResult<Option<ChannelRow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHANNELS)?;
        match table.get(channel_key(address, channel).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up a channel together with its board row.
    pub fn channel_with_board(
        &self,
        address: &str,
        channel: u16,
    ) -> HvResult<Option<(BoardRow, ChannelRow)>> {
        let board = match self.board(address)? {
            Some(board) => board,
            None => return Ok(None),
        };
        match self.channel(address, channel)? {
            Some(row) => Ok(Some((board, row))),
            None => Ok(None),
        }
    }

    /// Merge parameter values into a channel row and stamp `last_update`.
    pub fn update_channel_params(
        &self,
        address: &str,
        channel: u16,
        values: &BTreeMap<String, f64>,
        last_update: Timestamp,
    ) -> HvResult<()> {
        let key = channel_key(address, channel);
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CHANNELS)?;
            let mut row: ChannelRow = match table.get(key.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => {
                    return Err(HvError::ChannelNotFound {
                        address: address.to_string(),
                        channel,
                    })
                }
            };
            for (name, value) in values {
                row.params.insert(name.clone(), *value);
            }
            row.last_update = Some(last_update);
            let bytes = serde_json::to_vec(&row)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn channel_keys_of<T>(table: &T, address: &str) -> HvResult<Vec<String>>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let prefix = channel_prefix(address);
        let mut keys = Vec::new();
        for entry in table.range::<&str>(prefix.as_str()..)? {
            let (key, _) = entry?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}
