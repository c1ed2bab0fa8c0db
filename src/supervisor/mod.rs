//! Device state supervisor.
//!
//! The [`Supervisor`] owns the parameter cache store, the hardware adapter,
//! and the per-layer voltage profile, and coordinates the three policies
//! built on top of them:
//!
//! - [`directory`]: reconciles configured boards/channels against the cache
//!   and live hardware (startup and teardown lifecycle)
//! - [`refresh`]: TTL-bounded read-through and write-through of channel
//!   parameters
//! - [`controller`]: per-layer voltage targets and ramp speeds, power
//!   up/down
//!
//! Execution is single-threaded and synchronous: every operation runs to
//! completion before the next begins, and the store is visited through
//! short-lived transactions only.

pub mod controller;
pub mod directory;
pub mod params;
pub mod refresh;

pub use directory::{BoardFailure, ReconcileReport};
pub use refresh::{ChannelParams, Freshness};

use crate::core::config::{Config, SupervisorConfig, VoltageProfile};
use crate::core::error::HvResult;
use crate::core::time::{Clock, SystemClock, Timestamp};
use crate::hw::HardwareAdapter;
use crate::store::{CacheStore, ChannelRow};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Supervisor over a fleet of high-voltage boards.
pub struct Supervisor {
    store: CacheStore,
    adapter: Box<dyn HardwareAdapter>,
    clock: Arc<dyn Clock>,
    profile: VoltageProfile,
    refresh_ttl_ms: u64,
    base_ramp_up: f64,
    base_ramp_down: f64,
    imon_range: f64,
}

impl Supervisor {
    /// Start a supervisor from configuration: open the store at the
    /// configured path, reconcile the directory, and apply the startup
    /// safe-parameter pass to every channel.
    ///
    /// Per-board initialization failures do not abort startup; they are
    /// reported in the returned [`ReconcileReport`].
    pub fn start(
        config: &Config,
        adapter: Box<dyn HardwareAdapter>,
    ) -> HvResult<(Self, ReconcileReport)> {
        let store = CacheStore::open(Path::new(&config.supervisor.storage_path))?;
        Self::start_with(store, adapter, Arc::new(SystemClock), config)
    }

    /// Start a supervisor over explicit store and clock instances.
    pub fn start_with(
        store: CacheStore,
        adapter: Box<dyn HardwareAdapter>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> HvResult<(Self, ReconcileReport)> {
        let profile = config.profile()?;
        let specs = config.board_specs()?;
        let supervisor = Self::new(store, adapter, clock, profile, &config.supervisor);
        let report = supervisor.reconcile(&specs)?;
        supervisor.apply_safe_defaults()?;
        info!(
            live = report.live.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "supervisor started"
        );
        Ok((supervisor, report))
    }

    /// Assemble a supervisor without touching hardware or the store.
    pub fn new(
        store: CacheStore,
        adapter: Box<dyn HardwareAdapter>,
        clock: Arc<dyn Clock>,
        profile: VoltageProfile,
        settings: &SupervisorConfig,
    ) -> Self {
        Self {
            store,
            adapter,
            clock,
            profile,
            refresh_ttl_ms: settings.refresh_time_seconds * 1_000,
            base_ramp_up: settings.ramp_up,
            base_ramp_down: settings.ramp_down,
            imon_range: if settings.is_high_range { 0.0 } else { 1.0 },
        }
    }

    /// The underlying cache store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The per-layer voltage profile.
    pub fn profile(&self) -> &VoltageProfile {
        &self.profile
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn refresh_ttl_ms(&self) -> u64 {
        self.refresh_ttl_ms
    }

    /// Write the startup safe defaults to every cached channel: current
    /// range, layer maximum current, trip current, base ramp rates, and
    /// the power-down mode flag.
    pub fn apply_safe_defaults(&self) -> HvResult<()> {
        for (board, channel) in self.store.channels()? {
            let max_current = self.profile.max_current(channel.layer);
            self.write_parameters(
                &board.address,
                channel.channel,
                &[
                    (params::IMON_RANGE, self.imon_range),
                    (params::ISET, max_current),
                    (params::TRIP, 0.2),
                    (params::RUP, self.base_ramp_up),
                    (params::RDWN, self.base_ramp_down),
                    (params::PDWN, 1.0),
                ],
            )?;
        }
        Ok(())
    }

    /// Query parameters for every channel (or one layer's channels),
    /// projected to the requested names.
    ///
    /// The synthetic `VDef` value (the channel's layer default voltage) is
    /// part of the default projection. Unknown requested names are silently
    /// dropped.
    pub fn get_params(
        &self,
        layer: Option<i64>,
        select: Option<&BTreeSet<String>>,
    ) -> HvResult<Vec<ChannelReport>> {
        let mut requested: BTreeSet<&str> = params::PAR_NAMES.into_iter().collect();
        requested.insert(params::VDEF);
        if let Some(select) = select {
            requested.retain(|name| select.contains(*name));
        }

        let mut reports = Vec::new();
        for (board, channel) in self.selected_channels(layer)? {
            let values = match self.read_parameters(&board.address, channel.channel) {
                Ok(read) => {
                    let mut projected: BTreeMap<String, f64> = read
                        .values
                        .into_iter()
                        .filter(|(name, _)| requested.contains(name.as_str()))
                        .collect();
                    if requested.contains(params::VDEF) {
                        projected.insert(
                            params::VDEF.to_string(),
                            self.profile.default_voltage(channel.layer),
                        );
                    }
                    Some(projected)
                }
                Err(err) if err.is_hardware() => None,
                Err(err) => return Err(err),
            };
            reports.push(ChannelReport {
                channel: ChannelSummary::new(&board.address, board.conet, board.link, &channel),
                params: values,
            });
        }
        Ok(reports)
    }

    pub(crate) fn selected_channels(
        &self,
        layer: Option<i64>,
    ) -> HvResult<Vec<(crate::store::BoardRow, ChannelRow)>> {
        match layer {
            None => self.store.channels(),
            Some(layer) => self.store.channels_by_layer(layer),
        }
    }
}

/// One channel's slice of a fleet parameter query.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    /// Channel identity and board coordinates.
    pub channel: ChannelSummary,
    /// Projected parameter values; `None` if the channel vanished from the
    /// cache or its board is offline.
    pub params: Option<BTreeMap<String, f64>>,
}

/// Channel identity as reported to ticket callers.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    /// Human-readable label.
    pub alias: String,
    /// Channel number on its board.
    pub channel_num: u16,
    /// Layer grouping key.
    pub layer: Option<i64>,
    /// Board bus coordinates keyed by board address.
    pub board_info: BTreeMap<String, BoardCoords>,
}

impl ChannelSummary {
    fn new(address: &str, conet: i64, link: i64, channel: &ChannelRow) -> Self {
        let mut board_info = BTreeMap::new();
        board_info.insert(address.to_string(), BoardCoords { conet, link });
        Self {
            alias: channel.alias.clone(),
            channel_num: channel.channel,
            layer: channel.layer,
            board_info,
        }
    }
}

/// Physical bus path of a board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardCoords {
    /// Conet number.
    pub conet: i64,
    /// Link number.
    pub link: i64,
}
