//! Tests for ticket execution against a live (simulated) fleet.

mod common;

use common::start_fixture;
use hvfleet::tickets::Ticket;
use serde_json::Value;

fn execute(fx: &common::Fixture, request: &str) -> Value {
    let ticket = Ticket::from_json_str(request).expect("valid request");
    ticket.execute(&fx.supervisor)
}

fn assert_envelope(envelope: &Value, status: bool) {
    let object = envelope.as_object().expect("envelope is an object");
    assert_eq!(object.len(), 2, "envelope has exactly status and body");
    assert_eq!(object["status"], Value::Bool(status));
    assert!(object["body"].is_object());
}

// ============================================================================
// Envelope shape
// ============================================================================

#[test]
fn every_execution_yields_a_well_formed_envelope() {
    let fx = start_fixture();
    let requests = [
        r#"{"name": "Down", "params": {}}"#,
        r#"{"name": "SetVoltage", "params": {"target_voltage": 0.5}}"#,
        r#"{"name": "SetVoltage", "params": {"target_voltage": 7.0}}"#,
        r#"{"name": "GetParams", "params": {"select_params": null}}"#,
    ];
    for request in requests {
        let envelope = execute(&fx, request);
        let object = envelope.as_object().unwrap();
        assert_eq!(object.len(), 2, "{request}");
        assert!(object.contains_key("status"), "{request}");
        assert!(object["body"].is_object(), "{request}");
    }
}

// ============================================================================
// Down
// ============================================================================

#[test]
fn down_powers_the_fleet_off() {
    let fx = start_fixture();
    fx.supervisor.set_voltage(None, 1.0).unwrap();

    let envelope = execute(&fx, r#"{"name": "Down", "params": {}}"#);
    assert_envelope(&envelope, true);
    assert_eq!(envelope["body"], serde_json::json!({}));

    for (_, channel) in fx.supervisor.store().channels().unwrap() {
        assert_eq!(channel.params["Pw"], 0.0);
        assert_eq!(channel.params["VSet"], 0.0);
    }
}

// ============================================================================
// SetVoltage
// ============================================================================

#[test]
fn set_voltage_ticket_applies_the_multiplier() {
    let fx = start_fixture();
    let envelope = execute(
        &fx,
        r#"{"name": "SetVoltage", "params": {"target_voltage": 0.5}}"#,
    );
    assert_envelope(&envelope, true);

    let row = fx.supervisor.store().channel("40000000", 0).unwrap().unwrap();
    assert_eq!(row.params["VSet"], 500.0);
    assert_eq!(row.params["Pw"], 1.0);
}

#[test]
fn out_of_range_multiplier_becomes_a_false_envelope() {
    let fx = start_fixture();
    let envelope = execute(
        &fx,
        r#"{"name": "SetVoltage", "params": {"target_voltage": 1.5}}"#,
    );
    assert_envelope(&envelope, false);
    let message = envelope["body"]["error"].as_str().unwrap();
    assert!(message.contains("1.5"), "{message}");
}

#[test]
fn write_failures_surface_as_false_envelopes() {
    let fx = start_fixture();
    fx.sim.set_fail_writes(true);
    let envelope = execute(
        &fx,
        r#"{"name": "SetVoltage", "params": {"target_voltage": 0.5}}"#,
    );
    assert_envelope(&envelope, false);
    assert!(envelope["body"]["error"].as_str().is_some());
}

// ============================================================================
// GetParams
// ============================================================================

#[test]
fn get_params_reports_every_channel() {
    let fx = start_fixture();
    let envelope = execute(&fx, r#"{"name": "GetParams", "params": {"select_params": null}}"#);
    assert_envelope(&envelope, true);

    let reports = envelope["body"]["params"].as_array().unwrap();
    assert_eq!(reports.len(), 4);
    for report in reports {
        let channel = report["channel"].as_object().unwrap();
        assert!(channel.contains_key("alias"));
        assert!(channel.contains_key("channel_num"));
        assert!(channel.contains_key("layer"));
        assert!(channel.contains_key("board_info"));
        assert!(report["params"].is_object());
    }
}

#[test]
fn get_params_injects_the_layer_default_voltage() {
    let fx = start_fixture();
    let envelope = execute(&fx, r#"{"name": "GetParams", "params": {"select_params": null}}"#);

    let reports = envelope["body"]["params"].as_array().unwrap();
    for report in reports {
        let layer = report["channel"]["layer"].as_i64();
        let vdef = report["params"]["VDef"].as_f64().unwrap();
        match layer {
            Some(1) => assert_eq!(vdef, 1000.0),
            Some(2) => assert_eq!(vdef, 2000.0),
            _ => assert_eq!(vdef, 0.0),
        }
    }
}

#[test]
fn selection_projects_and_drops_unknown_names() {
    let fx = start_fixture();
    let envelope = execute(
        &fx,
        r#"{"name": "GetParams", "params": {"select_params": ["VMon", "VDef", "Bogus"]}}"#,
    );
    assert_envelope(&envelope, true);

    let reports = envelope["body"]["params"].as_array().unwrap();
    for report in reports {
        let params = report["params"].as_object().unwrap();
        let mut names: Vec<&str> = params.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["VDef", "VMon"]);
    }
}

#[test]
fn selection_may_exclude_the_synthetic_default() {
    let fx = start_fixture();
    let envelope = execute(
        &fx,
        r#"{"name": "GetParams", "params": {"select_params": ["VSet"]}}"#,
    );

    let reports = envelope["body"]["params"].as_array().unwrap();
    for report in reports {
        let params = report["params"].as_object().unwrap();
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("VSet"));
    }
}
