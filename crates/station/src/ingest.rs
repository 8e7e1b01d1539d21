//! Telemetry ingestion.
//!
//! Decodes inbound MAVLink traffic into core telemetry updates: position
//! and heartbeat state for both vehicles, and follower parameter values for
//! the speed profile resolver.
//!
//! # Coordinate Format
//!
//! GLOBAL_POSITION_INT carries lat/lon as degrees * 1e7, altitudes in mm,
//! velocities in cm/s, and heading in centidegrees (65535 = unknown).

use mavlink::common::{MavMessage, MavModeFlag};
use mavlink::MavHeader;

use pursuit_core::params::ParamSnapshot;
use pursuit_core::speed::SpeedProfile;
use pursuit_core::telemetry::{PositionUpdate, TelemetryStore, VehicleRole};

/// MAVLink addresses of the leader/follower pairing.
#[derive(Debug, Clone, Copy)]
pub struct VehicleEndpoints {
    pub leader_system: u8,
    pub leader_component: u8,
    pub follower_system: u8,
    pub follower_component: u8,
}

impl Default for VehicleEndpoints {
    fn default() -> Self {
        Self {
            leader_system: 1,
            leader_component: 1,
            follower_system: 2,
            follower_component: 1,
        }
    }
}

impl VehicleEndpoints {
    /// Map a message header onto a vehicle role, if it matches either side.
    pub fn role_of(&self, header: &MavHeader) -> Option<VehicleRole> {
        if header.system_id == self.leader_system && header.component_id == self.leader_component {
            Some(VehicleRole::Leader)
        } else if header.system_id == self.follower_system
            && header.component_id == self.follower_component
        {
            Some(VehicleRole::Follower)
        } else {
            None
        }
    }
}

/// What an inbound message contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested {
    /// Position snapshot replaced for a vehicle
    Position(VehicleRole),
    /// Heartbeat recorded for a vehicle
    Heartbeat(VehicleRole),
    /// Follower parameter cached
    Parameter(String),
    /// Message not relevant to guidance
    Ignored,
}

/// Stateless decoder from MAVLink messages to core updates.
#[derive(Debug, Default)]
pub struct TelemetryIngest {
    endpoints: VehicleEndpoints,
}

impl TelemetryIngest {
    /// Create an ingest for the given pairing.
    pub fn new(endpoints: VehicleEndpoints) -> Self {
        Self { endpoints }
    }

    /// The configured pairing.
    pub fn endpoints(&self) -> &VehicleEndpoints {
        &self.endpoints
    }

    /// Apply one inbound message to the telemetry store and parameter
    /// snapshot. Messages from unknown vehicles are ignored.
    pub fn handle(
        &self,
        header: &MavHeader,
        message: &MavMessage,
        now_ms: u64,
        store: &mut TelemetryStore,
        params: &mut ParamSnapshot,
    ) -> Ingested {
        let Some(role) = self.endpoints.role_of(header) else {
            return Ingested::Ignored;
        };

        match message {
            MavMessage::GLOBAL_POSITION_INT(data) => {
                let latitude = data.lat as f64 * 1e-7;
                let longitude = data.lon as f64 * 1e-7;
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Ingested::Ignored;
                }

                let heading_deg = if data.hdg != u16::MAX {
                    Some((data.hdg as f32 * 0.01) % 360.0)
                } else {
                    None
                };

                store.update_position(
                    role,
                    PositionUpdate {
                        latitude,
                        longitude,
                        alt_amsl_m: data.alt as f32 * 0.001,
                        alt_rel_m: data.relative_alt as f32 * 0.001,
                        vel_ned_ms: [
                            data.vx as f32 * 0.01,
                            data.vy as f32 * 0.01,
                            data.vz as f32 * 0.01,
                        ],
                        heading_deg,
                    },
                    now_ms,
                );
                Ingested::Position(role)
            }
            MavMessage::HEARTBEAT(data) => {
                let armed = data
                    .base_mode
                    .contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
                store.update_heartbeat(role, armed, now_ms);
                Ingested::Heartbeat(role)
            }
            MavMessage::PARAM_VALUE(data) if role == VehicleRole::Follower => {
                let Ok(raw_id) = core::str::from_utf8(&data.param_id) else {
                    return Ingested::Ignored;
                };
                let name = raw_id.trim_end_matches('\0');
                // Cache only the parameters the speed profiles consult, so
                // a full parameter download cannot evict them.
                if !is_guidance_param(name) {
                    return Ingested::Ignored;
                }
                match params.insert(name, data.param_value) {
                    Ok(()) => Ingested::Parameter(name.to_string()),
                    Err(_) => Ingested::Ignored,
                }
            }
            _ => Ingested::Ignored,
        }
    }
}

fn is_guidance_param(name: &str) -> bool {
    SpeedProfile::Cruise
        .candidates()
        .iter()
        .chain(SpeedProfile::Max.candidates())
        .any(|(candidate, _scale)| *candidate == name)
}
