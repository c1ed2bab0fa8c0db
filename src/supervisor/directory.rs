//! Device directory: reconciliation and teardown lifecycle.
//!
//! Reconciliation drives the cached board/channel set to exactly match the
//! configured one. Boards that drop out of configuration are marked
//! removable (handle cleared) and purged; surviving boards are
//! re-initialized and get their channel set replaced from configuration;
//! new boards are initialized and inserted. A board whose hardware
//! initialization fails is excluded from the live directory and reported,
//! never silently retried.

use crate::core::config::BoardSpec;
use crate::core::error::{HvError, HvResult};
use crate::store::{BoardRow, ChannelRow};
use crate::supervisor::Supervisor;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReconcileReport {
    /// Addresses of boards that are live after the pass.
    pub live: Vec<String>,
    /// Addresses of cached boards removed because configuration no longer
    /// declares them.
    pub removed: Vec<String>,
    /// Boards excluded because hardware initialization failed.
    pub failed: Vec<BoardFailure>,
}

/// One board that could not be initialized.
#[derive(Debug, Clone, Serialize)]
pub struct BoardFailure {
    /// Board address.
    pub address: String,
    /// Adapter error message.
    pub error: String,
}

impl Supervisor {
    /// Reconcile the cached board/channel set against configuration.
    ///
    /// After a successful pass the cache's board set is exactly the address
    /// set of `config` minus boards whose initialization failed, each live
    /// board carries a fresh handle, and each channel set matches its spec.
    pub fn reconcile(&self, config: &[BoardSpec]) -> HvResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let cached = self.store.boards()?;
        let configured: BTreeMap<&str, &BoardSpec> = config
            .iter()
            .map(|spec| (spec.address.as_str(), spec))
            .collect();

        // Drop cached boards that configuration no longer declares.
        for board in &cached {
            if !configured.contains_key(board.address.as_str()) {
                self.store.set_board_handle(&board.address, None)?;
                report.removed.push(board.address.clone());
            }
        }
        self.store.purge_unhandled_boards()?;

        // Re-initialize surviving cached boards against their spec.
        for board in &cached {
            if let Some(spec) = configured.get(board.address.as_str()) {
                self.bring_up(spec, &mut report)?;
            }
        }

        // Initialize boards that are new in configuration.
        let cached_addresses: BTreeSet<&str> = cached
            .iter()
            .map(|board| board.address.as_str())
            .collect();
        for spec in config {
            if !cached_addresses.contains(spec.address.as_str()) {
                self.bring_up(spec, &mut report)?;
            }
        }

        // Anything that failed to come up has no handle and is purged.
        self.store.purge_unhandled_boards()?;
        info!(
            live = report.live.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "directory reconciled"
        );
        Ok(report)
    }

    fn bring_up(&self, spec: &BoardSpec, report: &mut ReconcileReport) -> HvResult<()> {
        match self.adapter.initialize(&spec.address, spec.conet, spec.link) {
            Ok(handle) => {
                self.store.upsert_board(&BoardRow {
                    address: spec.address.clone(),
                    conet: spec.conet,
                    link: spec.link,
                    handle: Some(handle),
                })?;
                let rows: Vec<ChannelRow> = spec
                    .channels
                    .iter()
                    .map(|ch| ChannelRow {
                        board_address: spec.address.clone(),
                        channel: ch.channel,
                        alias: ch.alias.clone(),
                        layer: ch.layer,
                        last_update: None,
                        params: BTreeMap::new(),
                    })
                    .collect();
                self.store.replace_channels(&spec.address, &rows)?;
                report.live.push(spec.address.clone());
            }
            Err(err) => {
                warn!(address = %spec.address, error = %err, "board initialization failed");
                // Leave no live record behind; the purge pass removes any
                // stale row for this address.
                if self.store.board(&spec.address)?.is_some() {
                    self.store.set_board_handle(&spec.address, None)?;
                }
                report.failed.push(BoardFailure {
                    address: spec.address.clone(),
                    error: err.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Drive the fleet to a safe state and close every hardware session.
    ///
    /// Voltage is ramped to zero and every channel powered down before the
    /// boards are deinitialized; handles are cleared and handle-less rows
    /// purged. Idempotent: a second call finds no live handles and returns
    /// immediately.
    pub fn teardown(&self) -> HvResult<()> {
        let boards = self.store.boards()?;
        if boards.iter().all(|board| board.handle.is_none()) {
            self.store.purge_unhandled_boards()?;
            return Ok(());
        }

        if let Err(err) = self.set_voltage(None, 0.0) {
            warn!(error = %err, "teardown: zero-voltage pass failed");
        }
        if let Err(err) = self.power_down(None) {
            warn!(error = %err, "teardown: power-down pass failed");
        }

        for board in boards {
            if let Some(handle) = board.handle {
                if let Err(err) = self.adapter.deinitialize(handle) {
                    warn!(address = %board.address, error = %err, "deinitialize failed");
                }
                self.store.set_board_handle(&board.address, None)?;
            }
        }
        self.store.purge_unhandled_boards()?;
        info!("supervisor torn down");
        Ok(())
    }

    /// Resolve a board's live handle, or fail if it has none.
    pub(crate) fn live_handle(&self, board: &BoardRow) -> HvResult<crate::hw::Handle> {
        board.handle.ok_or_else(|| HvError::BoardOffline {
            address: board.address.clone(),
        })
    }
}
