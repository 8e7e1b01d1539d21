//! Intercept prediction
//!
//! First-order constant-velocity intercept: project the leader forward along
//! its ground course and find the time at which the follower, flying the
//! resolved speed straight at the projected point, arrives together with it.

use libm::{cos, cosf, hypotf, sinf};

use crate::config::{AltitudeFrame, GuidanceConfig};
use crate::geo::{haversine_distance_bearing, offset_position, wrap_180};
use crate::speed::SpeedResolution;
use crate::telemetry::VehicleState;

/// Refinement steps for the time-to-go fixed point.
const INTERCEPT_ITERATIONS: usize = 8;

/// Commanded rendezvous point for the follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptTarget {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in the configured frame, meters
    pub altitude_m: f32,
    /// NED velocity toward the target, present only under velocity override
    pub velocity_ned_ms: Option<[f32; 3]>,
}

/// A solved (possibly degraded) intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterceptSolution {
    /// Where to send the follower
    pub target: InterceptTarget,
    /// Estimated time until rendezvous, seconds
    pub time_to_go_s: f32,
    /// True when the leader outruns the follower and the target falls back
    /// to the leader's current position
    pub degraded: bool,
}

/// Outcome of one prediction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    /// A target was produced
    Solution(InterceptSolution),
    /// Follower is inside the engagement hold-off radius; no target
    TooClose {
        /// Current range to the leader, meters
        range_m: f32,
    },
}

/// Compute the intercept target for the current leader/follower states.
pub fn predict(
    leader: &VehicleState,
    follower: &VehicleState,
    resolution: &SpeedResolution,
    config: &GuidanceConfig,
) -> Prediction {
    let (range_m, bearing_to_leader) = haversine_distance_bearing(
        follower.latitude,
        follower.longitude,
        leader.latitude,
        leader.longitude,
    );
    if range_m < config.min_distance_m as f64 {
        return Prediction::TooClose {
            range_m: range_m as f32,
        };
    }

    let speed = resolution.speed_ms.max(0.1) as f64;
    let leader_speed = leader.ground_speed_ms() as f64;
    // A stationary leader has no course; aim along the line of sight.
    let leader_course = leader.ground_course_deg().unwrap_or(bearing_to_leader);

    // Closing rate along the line of sight, as if the follower flew the
    // resolved speed straight at the leader.
    let closing =
        speed - leader_speed * cos(wrap_180(bearing_to_leader - leader_course).to_radians());

    let altitude_m = leader.altitude_m(config.altitude_frame) + config.target_alt_offset_m;

    if closing < config.min_closing_ms as f64 {
        // Leader is pulling away; degrade to aiming at where it is now.
        let target = finish_target(
            leader.latitude,
            leader.longitude,
            altitude_m,
            follower,
            resolution,
            config,
        );
        return Prediction::Solution(InterceptSolution {
            target,
            time_to_go_s: (range_m / speed) as f32,
            degraded: true,
        });
    }

    // Fixed-point iteration on time-to-go: guess from the closing rate,
    // then alternate projecting the leader and re-timing the transit.
    let max_lookahead = config.max_lookahead_s as f64;
    let mut time_to_go = (range_m / closing).min(max_lookahead);
    let mut point = offset_position(
        leader.latitude,
        leader.longitude,
        leader_course,
        leader_speed * time_to_go,
    );
    for _ in 0..INTERCEPT_ITERATIONS {
        let (transit_m, _) =
            haversine_distance_bearing(follower.latitude, follower.longitude, point.0, point.1);
        time_to_go = (transit_m / speed).min(max_lookahead);
        point = offset_position(
            leader.latitude,
            leader.longitude,
            leader_course,
            leader_speed * time_to_go,
        );
    }

    let target = finish_target(point.0, point.1, altitude_m, follower, resolution, config);
    Prediction::Solution(InterceptSolution {
        target,
        time_to_go_s: time_to_go as f32,
        degraded: false,
    })
}

/// NED velocity of magnitude `speed_ms` from the follower's position toward
/// (`lat`, `lon`, `altitude_m`). `None` when the follower sits on the point.
pub fn velocity_toward(
    follower: &VehicleState,
    lat: f64,
    lon: f64,
    altitude_m: f32,
    frame: AltitudeFrame,
    speed_ms: f32,
) -> Option<[f32; 3]> {
    let (horizontal_m, bearing) =
        haversine_distance_bearing(follower.latitude, follower.longitude, lat, lon);
    let alt_error = altitude_m - follower.altitude_m(frame);
    let distance_3d = hypotf(horizontal_m as f32, alt_error);
    if distance_3d <= 1e-3 {
        return None;
    }

    let horizontal_ratio = horizontal_m as f32 / distance_3d;
    let bearing_rad = bearing as f32 * core::f32::consts::PI / 180.0;
    Some([
        speed_ms * horizontal_ratio * cosf(bearing_rad),
        speed_ms * horizontal_ratio * sinf(bearing_rad),
        // NED: positive down, so climbing means negative vz
        speed_ms * (-alt_error / distance_3d),
    ])
}

fn finish_target(
    lat: f64,
    lon: f64,
    altitude_m: f32,
    follower: &VehicleState,
    resolution: &SpeedResolution,
    config: &GuidanceConfig,
) -> InterceptTarget {
    let velocity_ned_ms = if resolution.velocity_override && resolution.speed_ms > 0.0 {
        velocity_toward(
            follower,
            lat,
            lon,
            altitude_m,
            config.altitude_frame,
            resolution.speed_ms,
        )
    } else {
        None
    };
    InterceptTarget {
        latitude: lat,
        longitude: lon,
        altitude_m,
        velocity_ned_ms,
    }
}
