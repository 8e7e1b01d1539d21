//! Guidance command message builders.
//!
//! Converts the core's command requests into MAVLink common-dialect
//! messages. All builders are pure; sending is the link's job.

use mavlink::common::{
    MavCmd, MavFrame, MavMessage, MavModeFlag, PositionTargetTypemask, COMMAND_LONG_DATA,
    PARAM_REQUEST_READ_DATA, SET_POSITION_TARGET_GLOBAL_INT_DATA,
};

use pursuit_core::config::AltitudeFrame;
use pursuit_core::guidance::PositionCommand;

/// ArduPlane FBWA custom mode number (manual-assist hand-off).
const PLANE_MODE_FBWA: u32 = 5;

/// Build a `MAV_CMD_DO_CHANGE_SPEED` command for the follower.
///
/// Speed type 0 = airspeed; throttle -1 leaves the throttle setting alone.
pub fn build_change_speed(target_system: u8, target_component: u8, speed_ms: f32) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system,
        target_component,
        command: MavCmd::MAV_CMD_DO_CHANGE_SPEED,
        confirmation: 0,
        param1: 0.0,
        param2: speed_ms,
        param3: -1.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

/// Build a `SET_POSITION_TARGET_GLOBAL_INT` for the smoothed target.
///
/// Acceleration and yaw fields are always masked out; velocity fields are
/// masked out unless the command carries a vector.
pub fn build_position_target(
    command: &PositionCommand,
    target_system: u8,
    target_component: u8,
    time_boot_ms: u32,
) -> MavMessage {
    let coordinate_frame = match command.frame {
        AltitudeFrame::Amsl => MavFrame::MAV_FRAME_GLOBAL_INT,
        AltitudeFrame::Relative => MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT_INT,
    };

    let mut type_mask = PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE
        | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE;

    let [vx, vy, vz] = match command.velocity_ned_ms {
        Some(velocity) => velocity,
        None => {
            type_mask |= PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE
                | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VY_IGNORE
                | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE;
            [0.0, 0.0, 0.0]
        }
    };

    MavMessage::SET_POSITION_TARGET_GLOBAL_INT(SET_POSITION_TARGET_GLOBAL_INT_DATA {
        time_boot_ms,
        target_system,
        target_component,
        coordinate_frame,
        type_mask,
        lat_int: (command.latitude * 1e7) as i32,
        lon_int: (command.longitude * 1e7) as i32,
        alt: command.altitude_m,
        vx,
        vy,
        vz,
        afx: 0.0,
        afy: 0.0,
        afz: 0.0,
        yaw: 0.0,
        yaw_rate: 0.0,
    })
}

/// Build a `MAV_CMD_DO_SET_MODE` switching the follower to FBWA.
pub fn build_manual_assist(target_system: u8, target_component: u8) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system,
        target_component,
        command: MavCmd::MAV_CMD_DO_SET_MODE,
        confirmation: 0,
        param1: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED.bits() as f32,
        param2: PLANE_MODE_FBWA as f32,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

/// Build a `PARAM_REQUEST_READ` for one named follower parameter.
pub fn build_param_request_read(
    target_system: u8,
    target_component: u8,
    name: &str,
) -> MavMessage {
    let mut param_id = [0u8; 16];
    let name_bytes = name.as_bytes();
    let copy_len = name_bytes.len().min(16);
    param_id[..copy_len].copy_from_slice(&name_bytes[..copy_len]);

    MavMessage::PARAM_REQUEST_READ(PARAM_REQUEST_READ_DATA {
        target_system,
        target_component,
        param_id,
        param_index: -1, // look up by name
    })
}
