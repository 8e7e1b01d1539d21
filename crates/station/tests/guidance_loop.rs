//! End-to-end guidance loop tests: MAVLink telemetry in, MAVLink commands out.

use mavlink::common::{
    MavAutopilot, MavCmd, MavMessage, MavModeFlag, MavParamType, MavState, MavType,
    PositionTargetTypemask, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA, PARAM_VALUE_DATA,
};
use mavlink::MavHeader;

use pursuit_core::config::GuidanceConfig;
use pursuit_core::guidance::{GuidanceController, GuidanceMode};
use pursuit_core::params::ParamSnapshot;
use pursuit_core::speed::SpeedProfile;
use pursuit_core::telemetry::TelemetryStore;
use pursuit_station::{MavCommandIssuer, TelemetryIngest, VehicleEndpoints};

fn header(system_id: u8) -> MavHeader {
    MavHeader {
        system_id,
        component_id: 1,
        sequence: 0,
    }
}

fn global_position(lat_deg: f64, lon_deg: f64, alt_m: f32, vel_ned_ms: [f32; 3]) -> MavMessage {
    MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        time_boot_ms: 0,
        lat: (lat_deg * 1e7) as i32,
        lon: (lon_deg * 1e7) as i32,
        alt: (alt_m * 1000.0) as i32,
        relative_alt: (alt_m * 1000.0) as i32,
        vx: (vel_ned_ms[0] * 100.0) as i16,
        vy: (vel_ned_ms[1] * 100.0) as i16,
        vz: (vel_ned_ms[2] * 100.0) as i16,
        hdg: u16::MAX,
    })
}

fn heartbeat_armed() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_FIXED_WING,
        autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
        base_mode: MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED
            | MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

fn param_value(name: &str, value: f32) -> MavMessage {
    let mut param_id = [0u8; 16];
    param_id[..name.len()].copy_from_slice(name.as_bytes());
    MavMessage::PARAM_VALUE(PARAM_VALUE_DATA {
        param_value: value,
        param_count: 1,
        param_index: 0,
        param_id,
        param_type: MavParamType::MAV_PARAM_TYPE_REAL32,
    })
}

/// Feed leader + follower telemetry at `now_ms`.
fn feed_telemetry(
    ingest: &TelemetryIngest,
    store: &mut TelemetryStore,
    params: &mut ParamSnapshot,
    now_ms: u64,
) {
    // Leader at (0, 0, 100m) flying east at 10 m/s
    ingest.handle(
        &header(1),
        &global_position(0.0, 0.0, 100.0, [0.0, 10.0, 0.0]),
        now_ms,
        store,
        params,
    );
    // Follower 0.01 deg south, stationary
    ingest.handle(
        &header(2),
        &global_position(-0.01, 0.0, 100.0, [0.0, 0.0, 0.0]),
        now_ms,
        store,
        params,
    );
    ingest.handle(&header(1), &heartbeat_armed(), now_ms, store, params);
    ingest.handle(&header(2), &heartbeat_armed(), now_ms, store, params);
}

#[test]
fn custom_profile_emits_speed_then_position() {
    let ingest = TelemetryIngest::new(VehicleEndpoints::default());
    let mut store = TelemetryStore::new();
    let mut params = ParamSnapshot::new();
    let mut controller = GuidanceController::new();
    let mut issuer = MavCommandIssuer::new(2, 1);
    let config = GuidanceConfig {
        follower_speed_ms: 15.0,
        ..GuidanceConfig::default()
    };

    feed_telemetry(&ingest, &mut store, &mut params, 1_000);
    controller.engage();
    let report = controller.tick(1_000, &config, &store, &params, &mut issuer);
    assert_eq!(report.mode, GuidanceMode::Tracking);

    let messages = issuer.drain();
    assert_eq!(messages.len(), 2);

    let MavMessage::COMMAND_LONG(speed) = &messages[0] else {
        panic!("expected DO_CHANGE_SPEED first, got {:?}", messages[0]);
    };
    assert_eq!(speed.command, MavCmd::MAV_CMD_DO_CHANGE_SPEED);
    assert!((speed.param2 - 15.0).abs() < 0.001);
    assert_eq!(speed.target_system, 2);

    let MavMessage::SET_POSITION_TARGET_GLOBAL_INT(target) = &messages[1] else {
        panic!(
            "expected SET_POSITION_TARGET_GLOBAL_INT second, got {:?}",
            messages[1]
        );
    };
    // Intercept point leads the leader eastward from (0, 0)
    assert!(target.lon_int > 0, "lon_int {}", target.lon_int);
    assert!((target.alt - 100.0).abs() < 0.5);
    // No velocity override under the custom profile
    assert!(target
        .type_mask
        .contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE));
}

#[test]
fn max_profile_param_flows_through_to_velocity_override() {
    let ingest = TelemetryIngest::new(VehicleEndpoints::default());
    let mut store = TelemetryStore::new();
    let mut params = ParamSnapshot::new();
    let mut controller = GuidanceController::new();
    let mut issuer = MavCommandIssuer::new(2, 1);
    let config = GuidanceConfig {
        profile: SpeedProfile::Max,
        follower_speed_ms: 15.0,
        ..GuidanceConfig::default()
    };

    feed_telemetry(&ingest, &mut store, &mut params, 1_000);
    // Follower reports its maximum airspeed
    ingest.handle(
        &header(2),
        &param_value("ARSPD_FBW_MAX", 20.0),
        1_000,
        &mut store,
        &mut params,
    );

    controller.engage();
    let report = controller.tick(1_000, &config, &store, &params, &mut issuer);

    let resolution = report.resolution.unwrap();
    assert!((resolution.speed_ms - 20.0).abs() < 0.001);
    assert!(resolution.velocity_override);

    let messages = issuer.drain();
    let MavMessage::COMMAND_LONG(speed) = &messages[0] else {
        panic!("expected DO_CHANGE_SPEED first");
    };
    assert!((speed.param2 - 20.0).abs() < 0.001);

    let MavMessage::SET_POSITION_TARGET_GLOBAL_INT(target) = &messages[1] else {
        panic!("expected SET_POSITION_TARGET_GLOBAL_INT second");
    };
    assert!(
        !target
            .type_mask
            .contains(PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE),
        "velocity fields must be live under velocity override"
    );
    // Roughly northward toward the intercept point at the resolved speed
    assert!(target.vx > 0.0);
    let speed_of = (target.vx * target.vx + target.vy * target.vy + target.vz * target.vz).sqrt();
    assert!((speed_of - 20.0).abs() < 0.1);
}

#[test]
fn stale_telemetry_stops_command_flow() {
    let ingest = TelemetryIngest::new(VehicleEndpoints::default());
    let mut store = TelemetryStore::new();
    let mut params = ParamSnapshot::new();
    let mut controller = GuidanceController::new();
    let mut issuer = MavCommandIssuer::new(2, 1);
    let config = GuidanceConfig {
        follower_speed_ms: 15.0,
        ..GuidanceConfig::default()
    };

    feed_telemetry(&ingest, &mut store, &mut params, 1_000);
    controller.engage();
    controller.tick(1_000, &config, &store, &params, &mut issuer);
    assert!(!issuer.drain().is_empty());

    // 10 seconds of silence: both positions stale, guidance idles
    let report = controller.tick(11_000, &config, &store, &params, &mut issuer);
    assert_eq!(report.mode, GuidanceMode::Idle);
    assert!(issuer.drain().is_empty());

    // Telemetry returns: commands resume
    feed_telemetry(&ingest, &mut store, &mut params, 12_000);
    let report = controller.tick(12_000, &config, &store, &params, &mut issuer);
    assert_eq!(report.mode, GuidanceMode::Tracking);
    assert_eq!(issuer.drain().len(), 2, "speed re-commanded after idle");
}
