//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use hvfleet::core::config::Config;
use hvfleet::core::time::ManualClock;
use hvfleet::hw::sim::{SimAdapter, SimState};
use hvfleet::store::CacheStore;
use hvfleet::supervisor::{ReconcileReport, Supervisor};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

/// Two boards: board "40000000" carries layers 1 and 2 plus an ungrouped
/// spare, board "40000001" carries layer 2 only. Layer 1 defaults to half
/// the fleet maximum so ramp-scaling assertions have a non-trivial ratio.
pub fn sample_config_json() -> &'static str {
    r#"{
        "board_info": {
            "40000000": {
                "conet": 0,
                "link": 0,
                "channels_by_layer": {"1": [0], "2": [1], "-1": [2]},
                "aliases": ["l1c0", "l2c1", "spare"]
            },
            "40000001": {
                "conet": 0,
                "link": 1,
                "channels_by_layer": {"2": [0]},
                "aliases": ["l2c0"]
            }
        },
        "default_voltages": {"1": 1000.0, "2": 2000.0},
        "default_max_current": {"1": 20.0, "2": 40.0}
    }"#
}

/// A started supervisor over the simulated fleet, with handles to
/// everything a test may want to poke at.
pub struct Fixture {
    pub supervisor: Supervisor,
    pub report: ReconcileReport,
    pub sim: SimAdapter,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    // Held so the store directory outlives the supervisor.
    _dir: TempDir,
}

/// Start a supervisor over a fresh store, the sample config, and a manual
/// clock pinned at t=0.
pub fn start_fixture() -> Fixture {
    start_fixture_with(SimAdapter::new(), sample_config_json())
}

/// Start a supervisor with a caller-prepared adapter (for failure
/// injection before reconciliation) or alternative config.
pub fn start_fixture_with(sim: SimAdapter, config_json: &str) -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let config = Config::from_json_str(config_json).expect("valid config");
    let store = CacheStore::open(&dir.path().join("cache.redb")).expect("open store");
    let clock = Arc::new(ManualClock::new(0));

    let (supervisor, report) = Supervisor::start_with(
        store,
        Box::new(sim.clone()),
        clock.clone(),
        &config,
    )
    .expect("supervisor start");

    Fixture {
        supervisor,
        report,
        sim,
        clock,
        config,
        _dir: dir,
    }
}

/// Shared simulator state for direct inspection.
pub fn sim_state(sim: &SimAdapter) -> Arc<Mutex<SimState>> {
    sim.state()
}
