//! Parameter refresh policy: TTL read-through and write-through.
//!
//! Cached channel parameters are trusted while `last_update` is younger
//! than the configured TTL; otherwise a live hardware read refreshes the
//! cache first. A failed refresh falls back to the last cached values;
//! the fallback is reported through [`Freshness::StaleFallback`] and a
//! warning, never silently.
//!
//! Writes always go to hardware first; on success the channel's full
//! parameter set is read back and cached so monitor-value side effects are
//! visible immediately. On hardware failure the cache is left untouched.

use crate::core::error::{HvError, HvResult};
use crate::store::BoardRow;
use crate::supervisor::{params, Supervisor};
use std::collections::BTreeMap;
use tracing::warn;

/// How the returned values relate to live hardware state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cached values within the TTL; no hardware read was needed.
    Cached,
    /// The cache was stale and a live read refreshed it.
    Refreshed,
    /// The cache was stale but the live read failed; values are the last
    /// known ones.
    StaleFallback,
}

/// A channel's parameter values plus their freshness.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    /// Values restricted to the fixed parameter-name set.
    pub values: BTreeMap<String, f64>,
    /// Freshness of the returned values.
    pub freshness: Freshness,
}

impl Supervisor {
    /// Read a channel's parameters through the TTL policy.
    ///
    /// Fails with `ChannelNotFound` if the channel is not cached. A refresh
    /// is scoped to this one channel; reads never block on another
    /// channel's staleness.
    pub fn read_parameters(&self, address: &str, channel: u16) -> HvResult<ChannelParams> {
        let (board, row) = self
            .store()
            .channel_with_board(address, channel)?
            .ok_or_else(|| HvError::ChannelNotFound {
                address: address.to_string(),
                channel,
            })?;

        let stale = match row.last_update {
            None => true,
            Some(ts) => self.now().elapsed_since(ts) > self.refresh_ttl_ms(),
        };

        let freshness = if stale {
            match self.refresh_channel(&board, channel) {
                Ok(()) => Freshness::Refreshed,
                Err(err) if err.is_hardware() => {
                    warn!(
                        address,
                        channel,
                        error = %err,
                        "refresh failed, returning stale cached values"
                    );
                    Freshness::StaleFallback
                }
                Err(err) => return Err(err),
            }
        } else {
            Freshness::Cached
        };

        let row = self
            .store()
            .channel(address, channel)?
            .ok_or_else(|| HvError::ChannelNotFound {
                address: address.to_string(),
                channel,
            })?;

        let values = row
            .params
            .into_iter()
            .filter(|(name, _)| params::is_known(name))
            .collect();
        Ok(ChannelParams { values, freshness })
    }

    /// Write name/value pairs to a channel, then read back and cache its
    /// full parameter set.
    pub fn write_parameters(
        &self,
        address: &str,
        channel: u16,
        pairs: &[(&str, f64)],
    ) -> HvResult<()> {
        let (board, _) = self
            .store()
            .channel_with_board(address, channel)?
            .ok_or_else(|| HvError::ChannelNotFound {
                address: address.to_string(),
                channel,
            })?;
        let handle = self.live_handle(&board)?;

        self.adapter.set_parameters(handle, &[channel], pairs)?;

        // The write landed; a failed read-back degrades to a stale cache
        // rather than failing the call.
        if let Err(err) = self.refresh_channel(&board, channel) {
            if err.is_hardware() {
                warn!(address, channel, error = %err, "read-back after write failed");
            } else {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Read the channel's full parameter set from hardware and cache it
    /// with a fresh `last_update`.
    pub(crate) fn refresh_channel(&self, board: &BoardRow, channel: u16) -> HvResult<()> {
        let handle = self.live_handle(board)?;
        let mut read = self
            .adapter
            .get_parameters(handle, &[channel], &params::PAR_NAMES)?;
        let values = read.remove(&channel).unwrap_or_default();
        self.store()
            .update_channel_params(&board.address, channel, &values, self.now())?;
        Ok(())
    }
}
