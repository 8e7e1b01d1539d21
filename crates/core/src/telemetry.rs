//! Per-vehicle telemetry state store
//!
//! Holds the latest known kinematic state for the leader and the follower.
//! Snapshots are immutable and replaced wholesale on each position update
//! (last-write-wins); timestamps are injected by the caller so staleness can
//! be evaluated without a clock dependency.

use core::fmt;

use crate::config::AltitudeFrame;

/// Which side of the pairing a vehicle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleRole {
    /// The tracked vehicle being chased
    Leader,
    /// The vehicle being steered
    Follower,
}

impl fmt::Display for VehicleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleRole::Leader => write!(f, "leader"),
            VehicleRole::Follower => write!(f, "follower"),
        }
    }
}

/// Kinematic fields of a position update, before timestamping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionUpdate {
    /// Latitude in degrees (-90 to +90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to +180)
    pub longitude: f64,
    /// Altitude above mean sea level in meters
    pub alt_amsl_m: f32,
    /// Altitude above the home position in meters
    pub alt_rel_m: f32,
    /// Ground velocity in NED frame (north, east, down), m/s
    pub vel_ned_ms: [f32; 3],
    /// Heading in degrees (0-360), if the vehicle reports one
    pub heading_deg: Option<f32>,
}

/// Immutable snapshot of one vehicle's kinematic state.
#[derive(Debug, Clone, Copy)]
pub struct VehicleState {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude above mean sea level in meters
    pub alt_amsl_m: f32,
    /// Altitude above the home position in meters
    pub alt_rel_m: f32,
    /// Ground velocity in NED frame (north, east, down), m/s
    pub vel_ned_ms: [f32; 3],
    /// Heading in degrees (0-360), if reported
    pub heading_deg: Option<f32>,
    /// Time this snapshot was taken (injected, milliseconds)
    pub timestamp_ms: u64,
}

impl VehicleState {
    /// Horizontal ground speed in m/s.
    pub fn ground_speed_ms(&self) -> f32 {
        libm::hypotf(self.vel_ned_ms[0], self.vel_ned_ms[1])
    }

    /// Ground course in degrees (0-360), or `None` when effectively stationary.
    pub fn ground_course_deg(&self) -> Option<f64> {
        if self.ground_speed_ms() < 0.01 {
            return None;
        }
        let course = libm::atan2(self.vel_ned_ms[1] as f64, self.vel_ned_ms[0] as f64);
        Some(crate::geo::wrap_360(course.to_degrees()))
    }

    /// Altitude in the selected frame.
    pub fn altitude_m(&self, frame: AltitudeFrame) -> f32 {
        match frame {
            AltitudeFrame::Amsl => self.alt_amsl_m,
            AltitudeFrame::Relative => self.alt_rel_m,
        }
    }
}

/// Heartbeat-derived link health, tracked separately from the kinematic
/// snapshot so a heartbeat alone never fabricates a position.
#[derive(Debug, Clone, Copy, Default)]
struct LinkHealth {
    /// Last heartbeat time in milliseconds (0 = never)
    last_heartbeat_ms: u64,
    /// Armed flag from the last heartbeat
    armed: bool,
}

/// Latest known state per vehicle.
///
/// `update_position` replaces the stored snapshot unconditionally; there is
/// no ordering check beyond timestamp comparison for staleness reporting.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    leader: Option<VehicleState>,
    follower: Option<VehicleState>,
    leader_health: LinkHealth,
    follower_health: LinkHealth,
}

impl TelemetryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot for `role` (last-write-wins).
    pub fn update_position(&mut self, role: VehicleRole, update: PositionUpdate, now_ms: u64) {
        let state = VehicleState {
            latitude: update.latitude,
            longitude: update.longitude,
            alt_amsl_m: update.alt_amsl_m,
            alt_rel_m: update.alt_rel_m,
            vel_ned_ms: update.vel_ned_ms,
            heading_deg: update.heading_deg,
            timestamp_ms: now_ms,
        };
        *self.slot_mut(role) = Some(state);
    }

    /// Record a heartbeat for `role`.
    pub fn update_heartbeat(&mut self, role: VehicleRole, armed: bool, now_ms: u64) {
        let health = self.health_mut(role);
        health.last_heartbeat_ms = now_ms;
        health.armed = armed;
    }

    /// Most recent snapshot regardless of age, or `None` if never updated.
    pub fn latest(&self, role: VehicleRole) -> Option<&VehicleState> {
        self.slot(role).as_ref()
    }

    /// Snapshot only if a position update has been received within
    /// `timeout_ms` of `now_ms`.
    pub fn fresh(&self, role: VehicleRole, now_ms: u64, timeout_ms: u64) -> Option<&VehicleState> {
        self.latest(role)
            .filter(|state| now_ms.saturating_sub(state.timestamp_ms) <= timeout_ms)
    }

    /// True when a heartbeat has been seen within `timeout_ms` of `now_ms`.
    pub fn heartbeat_fresh(&self, role: VehicleRole, now_ms: u64, timeout_ms: u64) -> bool {
        let health = self.health(role);
        health.last_heartbeat_ms > 0
            && now_ms.saturating_sub(health.last_heartbeat_ms) <= timeout_ms
    }

    /// Armed flag from the last heartbeat (false when none received).
    pub fn armed(&self, role: VehicleRole) -> bool {
        self.health(role).armed
    }

    /// Age of the stored position in milliseconds, or `None` if never updated.
    pub fn position_age_ms(&self, role: VehicleRole, now_ms: u64) -> Option<u64> {
        self.latest(role)
            .map(|state| now_ms.saturating_sub(state.timestamp_ms))
    }

    fn slot(&self, role: VehicleRole) -> &Option<VehicleState> {
        match role {
            VehicleRole::Leader => &self.leader,
            VehicleRole::Follower => &self.follower,
        }
    }

    fn slot_mut(&mut self, role: VehicleRole) -> &mut Option<VehicleState> {
        match role {
            VehicleRole::Leader => &mut self.leader,
            VehicleRole::Follower => &mut self.follower,
        }
    }

    fn health(&self, role: VehicleRole) -> &LinkHealth {
        match role {
            VehicleRole::Leader => &self.leader_health,
            VehicleRole::Follower => &self.follower_health,
        }
    }

    fn health_mut(&mut self, role: VehicleRole) -> &mut LinkHealth {
        match role {
            VehicleRole::Leader => &mut self.leader_health,
            VehicleRole::Follower => &mut self.follower_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_update(lat: f64, lon: f64) -> PositionUpdate {
        PositionUpdate {
            latitude: lat,
            longitude: lon,
            alt_amsl_m: 100.0,
            alt_rel_m: 50.0,
            vel_ned_ms: [3.0, 4.0, 0.0],
            heading_deg: Some(90.0),
        }
    }

    #[test]
    fn test_latest_none_before_first_update() {
        let store = TelemetryStore::new();
        assert!(store.latest(VehicleRole::Leader).is_none());
        assert!(store.latest(VehicleRole::Follower).is_none());
    }

    #[test]
    fn test_update_replaces_wholesale() {
        let mut store = TelemetryStore::new();
        store.update_position(VehicleRole::Leader, make_update(35.0, 139.0), 1000);
        store.update_position(VehicleRole::Leader, make_update(36.0, 140.0), 2000);

        let state = store.latest(VehicleRole::Leader).unwrap();
        assert!((state.latitude - 36.0).abs() < 1e-9);
        assert_eq!(state.timestamp_ms, 2000);
    }

    #[test]
    fn test_roles_are_independent() {
        let mut store = TelemetryStore::new();
        store.update_position(VehicleRole::Leader, make_update(35.0, 139.0), 1000);

        assert!(store.latest(VehicleRole::Leader).is_some());
        assert!(store.latest(VehicleRole::Follower).is_none());
    }

    #[test]
    fn test_fresh_within_timeout() {
        let mut store = TelemetryStore::new();
        store.update_position(VehicleRole::Follower, make_update(35.0, 139.0), 1000);

        assert!(store.fresh(VehicleRole::Follower, 3000, 3000).is_some());
        assert!(store.fresh(VehicleRole::Follower, 4001, 3000).is_none());
    }

    #[test]
    fn test_fresh_none_when_never_updated() {
        let store = TelemetryStore::new();
        assert!(store.fresh(VehicleRole::Leader, 0, 3000).is_none());
    }

    #[test]
    fn test_heartbeat_freshness_and_armed() {
        let mut store = TelemetryStore::new();
        assert!(!store.heartbeat_fresh(VehicleRole::Follower, 1000, 4500));

        store.update_heartbeat(VehicleRole::Follower, true, 1000);
        assert!(store.heartbeat_fresh(VehicleRole::Follower, 5000, 4500));
        assert!(!store.heartbeat_fresh(VehicleRole::Follower, 6000, 4500));
        assert!(store.armed(VehicleRole::Follower));
        assert!(!store.armed(VehicleRole::Leader));
    }

    #[test]
    fn test_ground_speed_and_course() {
        let mut store = TelemetryStore::new();
        store.update_position(VehicleRole::Leader, make_update(35.0, 139.0), 0);
        let state = store.latest(VehicleRole::Leader).unwrap();

        // [3, 4] north/east -> 5 m/s, course atan2(4, 3) ~ 53.13 deg
        assert!((state.ground_speed_ms() - 5.0).abs() < 0.001);
        let course = state.ground_course_deg().unwrap();
        assert!((course - 53.13).abs() < 0.01, "course {}", course);
    }

    #[test]
    fn test_course_none_when_stationary() {
        let state = VehicleState {
            latitude: 0.0,
            longitude: 0.0,
            alt_amsl_m: 0.0,
            alt_rel_m: 0.0,
            vel_ned_ms: [0.0, 0.0, 0.0],
            heading_deg: None,
            timestamp_ms: 0,
        };
        assert!(state.ground_course_deg().is_none());
    }

    #[test]
    fn test_altitude_frame_selection() {
        let mut store = TelemetryStore::new();
        store.update_position(VehicleRole::Leader, make_update(35.0, 139.0), 0);
        let state = store.latest(VehicleRole::Leader).unwrap();

        assert!((state.altitude_m(AltitudeFrame::Amsl) - 100.0).abs() < 0.001);
        assert!((state.altitude_m(AltitudeFrame::Relative) - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_position_age() {
        let mut store = TelemetryStore::new();
        assert!(store.position_age_ms(VehicleRole::Leader, 1000).is_none());

        store.update_position(VehicleRole::Leader, make_update(35.0, 139.0), 1000);
        assert_eq!(store.position_age_ms(VehicleRole::Leader, 2500), Some(1500));
    }
}
