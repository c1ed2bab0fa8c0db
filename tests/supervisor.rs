//! Tests for the supervisor: directory reconciliation, the TTL refresh
//! policy, the voltage/ramp controller, and teardown.

mod common;

use common::{sample_config_json, start_fixture, start_fixture_with};
use hvfleet::core::error::HvError;
use hvfleet::hw::sim::SimAdapter;
use hvfleet::supervisor::Freshness;
use hvfleet::time::Clock;

const TTL_MS: u64 = 10_000;

// ============================================================================
// Directory reconciliation
// ============================================================================

#[test]
fn startup_brings_up_every_configured_board() {
    let fx = start_fixture();
    assert_eq!(fx.report.live, ["40000000", "40000001"]);
    assert!(fx.report.removed.is_empty());
    assert!(fx.report.failed.is_empty());

    let boards = fx.supervisor.store().boards().unwrap();
    assert_eq!(boards.len(), 2);
    assert!(boards.iter().all(|board| board.handle.is_some()));
    assert_eq!(fx.supervisor.store().channels().unwrap().len(), 4);
}

#[test]
fn reconcile_is_idempotent() {
    let fx = start_fixture();
    let specs = fx.config.board_specs().unwrap();

    let report = fx.supervisor.reconcile(&specs).unwrap();
    assert_eq!(report.live, ["40000000", "40000001"]);
    assert!(report.removed.is_empty());
    assert!(report.failed.is_empty());

    let boards = fx.supervisor.store().boards().unwrap();
    assert_eq!(boards.len(), 2);
    assert!(boards.iter().all(|board| board.handle.is_some()));
    assert_eq!(fx.supervisor.store().channels().unwrap().len(), 4);
}

#[test]
fn dropped_board_is_removed_with_its_channels() {
    let fx = start_fixture();

    // Same fleet minus board 40000001.
    let narrowed = r#"{
        "board_info": {
            "40000000": {
                "conet": 0,
                "link": 0,
                "channels_by_layer": {"1": [0], "2": [1], "-1": [2]},
                "aliases": ["l1c0", "l2c1", "spare"]
            }
        },
        "default_voltages": {"1": 1000.0, "2": 2000.0},
        "default_max_current": {"1": 20.0, "2": 40.0}
    }"#;
    let config = hvfleet::core::config::Config::from_json_str(narrowed).unwrap();
    let report = fx.supervisor.reconcile(&config.board_specs().unwrap()).unwrap();

    assert_eq!(report.removed, ["40000001"]);
    assert!(fx.supervisor.store().board("40000001").unwrap().is_none());
    assert!(fx.supervisor.store().channel("40000001", 0).unwrap().is_none());
    assert_eq!(fx.supervisor.store().channels().unwrap().len(), 3);
}

#[test]
fn init_failure_excludes_the_board_but_not_the_fleet() {
    let sim = SimAdapter::new();
    sim.fail_init_for("40000001");
    let fx = start_fixture_with(sim, sample_config_json());

    assert_eq!(fx.report.live, ["40000000"]);
    assert_eq!(fx.report.failed.len(), 1);
    assert_eq!(fx.report.failed[0].address, "40000001");

    let boards = fx.supervisor.store().boards().unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0].address, "40000000");
}

// ============================================================================
// Startup safe defaults
// ============================================================================

#[test]
fn safe_defaults_are_written_and_cached() {
    let fx = start_fixture();

    // Layer-1 channel on board 40000000.
    let row = fx.supervisor.store().channel("40000000", 0).unwrap().unwrap();
    assert_eq!(row.params["ISet"], 20.0);
    assert_eq!(row.params["Trip"], 0.2);
    assert_eq!(row.params["RUp"], 10.0);
    assert_eq!(row.params["RDWn"], 100.0);
    assert_eq!(row.params["PDwn"], 1.0);
    assert_eq!(row.params["ImonRange"], 0.0);
    assert!(row.last_update.is_some());

    // Layer-2 channel gets its own max current.
    let row = fx.supervisor.store().channel("40000000", 1).unwrap().unwrap();
    assert_eq!(row.params["ISet"], 40.0);

    // The ungrouped spare falls back to the default max current.
    let row = fx.supervisor.store().channel("40000000", 2).unwrap().unwrap();
    assert_eq!(row.params["ISet"], 50.0);
}

// ============================================================================
// Refresh policy
// ============================================================================

#[test]
fn reads_within_ttl_hit_the_cache() {
    let fx = start_fixture();
    let before = fx.sim.read_calls();

    let read = fx.supervisor.read_parameters("40000000", 0).unwrap();
    assert_eq!(read.freshness, Freshness::Cached);
    assert_eq!(fx.sim.read_calls(), before);
}

#[test]
fn stale_reads_refresh_from_hardware() {
    let fx = start_fixture();
    let before = fx.sim.read_calls();

    fx.clock.advance_ms(TTL_MS + 1);
    let read = fx.supervisor.read_parameters("40000000", 0).unwrap();
    assert_eq!(read.freshness, Freshness::Refreshed);
    assert_eq!(fx.sim.read_calls(), before + 1);

    // The refresh stamped the row; the next read is cached again.
    let read = fx.supervisor.read_parameters("40000000", 0).unwrap();
    assert_eq!(read.freshness, Freshness::Cached);
    assert_eq!(fx.sim.read_calls(), before + 1);
}

#[test]
fn failed_refresh_falls_back_to_cached_values() {
    let fx = start_fixture();
    fx.supervisor.set_voltage(None, 0.5).unwrap();
    let cached = fx.supervisor.read_parameters("40000000", 0).unwrap();

    fx.clock.advance_ms(TTL_MS + 1);
    fx.sim.set_fail_reads(true);
    let read = fx.supervisor.read_parameters("40000000", 0).unwrap();
    assert_eq!(read.freshness, Freshness::StaleFallback);
    assert_eq!(read.values, cached.values);
}

#[test]
fn write_goes_through_and_reads_back() {
    let fx = start_fixture();

    fx.supervisor
        .write_parameters("40000000", 1, &[("VSet", 1234.0)])
        .unwrap();

    // Hardware saw the write.
    let state = fx.sim.state();
    let handle = fx.supervisor.store().board("40000000").unwrap().unwrap().handle.unwrap();
    assert_eq!(state.lock().stored(handle, 1, "VSet"), Some(1234.0));

    // The cache saw the read-back, including the mirrored monitor value.
    let row = fx.supervisor.store().channel("40000000", 1).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 1234.0);
    assert_eq!(row.params["VMon"], 1234.0);
}

#[test]
fn failed_write_leaves_the_cache_untouched() {
    let fx = start_fixture();
    let before = fx.supervisor.store().channel("40000000", 1).unwrap().unwrap();

    fx.sim.set_fail_writes(true);
    let err = fx
        .supervisor
        .write_parameters("40000000", 1, &[("VSet", 999.0)])
        .unwrap_err();
    assert!(err.is_hardware());

    let after = fx.supervisor.store().channel("40000000", 1).unwrap().unwrap();
    assert_eq!(before.params, after.params);
}

#[test]
fn unknown_channel_read_is_an_error() {
    let fx = start_fixture();
    let err = fx.supervisor.read_parameters("40000000", 99).unwrap_err();
    assert!(matches!(err, HvError::ChannelNotFound { .. }));
}

// ============================================================================
// Voltage/ramp controller
// ============================================================================

#[test]
fn set_voltage_scales_targets_and_ramps_per_layer() {
    let fx = start_fixture();
    fx.supervisor.set_voltage(None, 0.5).unwrap();

    // Layer 1 defaults to 1000 V, half the 2000 V fleet maximum.
    let row = fx.supervisor.store().channel("40000000", 0).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 500.0);
    assert_eq!(row.params["RUp"], 5.0);
    assert_eq!(row.params["RDWn"], 50.0);
    assert_eq!(row.params["Pw"], 1.0);

    // Layer 2 is the fleet maximum and ramps at full speed.
    let row = fx.supervisor.store().channel("40000000", 1).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 1000.0);
    assert_eq!(row.params["RUp"], 10.0);
    assert_eq!(row.params["RDWn"], 100.0);

    // The ungrouped spare has no layer default: zero target, full-speed
    // ramps.
    let row = fx.supervisor.store().channel("40000000", 2).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 0.0);
    assert_eq!(row.params["RUp"], 10.0);
}

#[test]
fn set_voltage_scopes_to_a_single_layer() {
    let fx = start_fixture();
    fx.supervisor.set_voltage(Some(2), 1.0).unwrap();

    let row = fx.supervisor.store().channel("40000001", 0).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 2000.0);

    // The layer-1 channel keeps its startup setpoint.
    let row = fx.supervisor.store().channel("40000000", 0).unwrap().unwrap();
    assert_eq!(row.params.get("VSet").copied().unwrap_or(0.0), 0.0);
}

#[test]
fn multiplier_range_is_enforced() {
    let fx = start_fixture();
    let writes_before = fx.sim.write_calls();
    for bad in [-0.1, 1.21, f64::NAN, f64::INFINITY] {
        let err = fx.supervisor.set_voltage(None, bad).unwrap_err();
        assert!(matches!(err, HvError::MultiplierOutOfRange { .. }), "{bad}");
    }
    // Rejection happens before any channel is touched.
    assert_eq!(fx.sim.write_calls(), writes_before);
    // Boundary values are allowed; 1.2 is the overvoltage test margin.
    fx.supervisor.set_voltage(None, 0.0).unwrap();
    fx.supervisor.set_voltage(None, 1.2).unwrap();
}

#[test]
fn power_down_zeroes_and_switches_off() {
    let fx = start_fixture();
    fx.supervisor.set_voltage(None, 1.0).unwrap();

    // Cross the staleness window first: the write-through read-back must
    // re-stamp every row at the time of the call, not leave a stale hit.
    fx.clock.advance_ms(TTL_MS + 1);
    fx.supervisor.power_down(None).unwrap();

    let now = fx.clock.now();
    for (_, channel) in fx.supervisor.store().channels().unwrap() {
        assert_eq!(channel.params["VSet"], 0.0);
        assert_eq!(channel.params["Pw"], 0.0);
        assert_eq!(channel.params["RDWn"], 100.0);
        assert_eq!(channel.last_update, Some(now));
    }
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn teardown_closes_sessions_and_is_idempotent() {
    let fx = start_fixture();
    let handles: Vec<i64> = fx
        .supervisor
        .store()
        .boards()
        .unwrap()
        .into_iter()
        .filter_map(|board| board.handle)
        .collect();
    assert_eq!(handles.len(), 2);

    fx.supervisor.teardown().unwrap();
    let state = fx.sim.state();
    for handle in &handles {
        assert!(!state.lock().is_live(*handle));
    }
    assert!(fx.supervisor.store().boards().unwrap().is_empty());

    // A second teardown finds nothing live and succeeds.
    fx.supervisor.teardown().unwrap();
}

#[test]
fn teardown_survives_hardware_failures() {
    let fx = start_fixture();
    fx.sim.set_fail_writes(true);
    fx.sim.set_fail_reads(true);

    // The safing passes fail, but sessions still close and rows clear.
    fx.supervisor.teardown().unwrap();
    assert!(fx.supervisor.store().boards().unwrap().is_empty());
}
