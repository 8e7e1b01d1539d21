//! Guidance controller
//!
//! The orchestrating state machine: on each tick it resolves the commanded
//! speed, pulls an intercept prediction (or the operator's manual waypoint),
//! feeds the target smoother, and decides which commands to emit through the
//! [`CommandIssuer`] boundary.

use bitflags::bitflags;
use libm::fabsf;

use crate::config::{AltitudeFrame, GuidanceConfig};
use crate::params::ParamSnapshot;
use crate::speed::{self, SpeedProfile, SpeedResolution};
use crate::telemetry::{TelemetryStore, VehicleRole};

use super::predictor::{predict, velocity_toward, InterceptTarget, Prediction};
use super::smoother::TargetSmoother;

bitflags! {
    /// Telemetry health warnings surfaced alongside the guidance report.
    ///
    /// Warnings never gate command emission by themselves; only position
    /// staleness does.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Warnings: u8 {
        /// Leader position older than the staleness threshold
        const LEADER_POSITION_STALE = 1 << 0;
        /// Follower position older than the staleness threshold
        const FOLLOWER_POSITION_STALE = 1 << 1;
        /// No recent leader heartbeat
        const LEADER_HEARTBEAT_LOST = 1 << 2;
        /// No recent follower heartbeat
        const FOLLOWER_HEARTBEAT_LOST = 1 << 3;
        /// Follower reports disarmed
        const FOLLOWER_DISARMED = 1 << 4;
    }
}

/// Guidance state machine modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuidanceMode {
    /// Paused by the operator, or telemetry too stale to guide
    #[default]
    Idle,
    /// Normal operation: commands flow every tick
    Tracking,
    /// Operator hand-off to manual-assist flight; no commands
    ManualOverride,
}

impl GuidanceMode {
    /// Mode name for logging and status surfaces.
    pub fn name(&self) -> &'static str {
        match self {
            GuidanceMode::Idle => "idle",
            GuidanceMode::Tracking => "tracking",
            GuidanceMode::ManualOverride => "manual-override",
        }
    }
}

impl core::fmt::Display for GuidanceMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the controller did (or why it did nothing) on the latest tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Operator hold; guidance disengaged
    Paused,
    /// Engaged but at least one vehicle's position is stale
    StaleTelemetry,
    /// Manual-assist hand-off is active
    ManualAssist,
    /// Follower inside the engagement hold-off radius
    WithinMinDistance {
        /// Range to the leader in meters
        range_m: f32,
    },
    /// Steering toward the predicted rendezvous
    Intercepting {
        /// Estimated time to rendezvous, seconds
        eta_s: f32,
        /// Leader currently outruns the follower
        degraded: bool,
    },
    /// Steering toward the operator's fixed waypoint
    ManualTarget,
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Condition::Paused => write!(f, "guidance paused by operator"),
            Condition::StaleTelemetry => write!(f, "waiting for fresh telemetry"),
            Condition::ManualAssist => write!(f, "manual assist hand-off active"),
            Condition::WithinMinDistance { range_m } => {
                write!(f, "within minimum distance ({:.1} m)", range_m)
            }
            Condition::Intercepting { eta_s, degraded } => {
                if *degraded {
                    write!(f, "leader outrunning follower; aiming at current position")
                } else {
                    write!(f, "intercepting leader, ETA {:.1} s", eta_s)
                }
            }
            Condition::ManualTarget => write!(f, "guiding to manual target"),
        }
    }
}

/// Position target handed to the command boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCommand {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in `frame`, meters
    pub altitude_m: f32,
    /// Altitude frame of `altitude_m`
    pub frame: AltitudeFrame,
    /// NED velocity, present only under velocity override
    pub velocity_ned_ms: Option<[f32; 3]>,
}

/// Boundary to the autopilot link.
///
/// Commands are fire-and-forget; implementations must preserve the order of
/// calls within a tick (speed strictly before position).
pub trait CommandIssuer {
    /// Request a change of commanded airspeed.
    fn change_speed(&mut self, speed_ms: f32);

    /// Request a position (and optionally velocity) target.
    fn position_target(&mut self, command: &PositionCommand);

    /// Request the one-time switch to manual-assist flight mode.
    fn manual_assist_mode(&mut self);
}

/// Status surface for CLI/log/GUI consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceReport {
    /// Current mode
    pub mode: GuidanceMode,
    /// Active speed profile
    pub profile: SpeedProfile,
    /// Last speed resolution, with source and fallback reason
    pub resolution: Option<SpeedResolution>,
    /// Current smoothed target, when one is being commanded
    pub target: Option<InterceptTarget>,
    /// Latest tick outcome
    pub condition: Condition,
    /// Telemetry health warnings
    pub warnings: Warnings,
}

impl Default for GuidanceReport {
    fn default() -> Self {
        Self {
            mode: GuidanceMode::Idle,
            profile: SpeedProfile::Custom,
            resolution: None,
            target: None,
            condition: Condition::Paused,
            warnings: Warnings::empty(),
        }
    }
}

/// The guidance state machine.
///
/// Single-threaded by design: ticks and operator commands run on the same
/// control thread, and all time is injected as `now_ms`.
#[derive(Debug, Default)]
pub struct GuidanceController {
    engaged: bool,
    override_active: bool,
    mode: GuidanceMode,
    smoother: TargetSmoother,
    manual_target: Option<InterceptTarget>,
    last_resolution: Option<SpeedResolution>,
    last_commanded_speed: Option<f32>,
    last_tick_ms: Option<u64>,
    report: GuidanceReport,
}

impl GuidanceController {
    /// Create a controller in Idle, disengaged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> GuidanceMode {
        self.mode
    }

    /// Latest status report.
    pub fn report(&self) -> &GuidanceReport {
        &self.report
    }

    /// Engage (or re-engage) tracking. The transition into Tracking happens
    /// on the next tick with fresh telemetry and forces a smoother reset.
    pub fn engage(&mut self) {
        self.engaged = true;
        self.override_active = false;
    }

    /// Operator hold: suppress all command emission from the next tick on.
    pub fn hold(&mut self) {
        self.engaged = false;
        self.override_active = false;
        self.apply_mode(GuidanceMode::Idle);
        self.report.mode = self.mode;
        self.report.condition = Condition::Paused;
        self.report.target = None;
    }

    /// Hand the follower to manual-assist flight. Emits the flight-mode
    /// request once, on entry.
    pub fn manual_assist<I: CommandIssuer>(&mut self, issuer: &mut I) {
        self.engaged = false;
        self.override_active = true;
        if self.mode != GuidanceMode::ManualOverride {
            self.apply_mode(GuidanceMode::ManualOverride);
            issuer.manual_assist_mode();
            self.report.mode = self.mode;
            self.report.condition = Condition::ManualAssist;
            self.report.target = None;
        }
    }

    /// Steer to a fixed waypoint instead of the prediction. Forces
    /// engagement and a smoother reset.
    pub fn set_manual_target(&mut self, latitude: f64, longitude: f64, altitude_m: f32) {
        self.manual_target = Some(InterceptTarget {
            latitude,
            longitude,
            altitude_m,
            velocity_ned_ms: None,
        });
        self.engaged = true;
        self.override_active = false;
        self.smoother.reset();
    }

    /// Drop the manual waypoint and return to predictive guidance.
    pub fn clear_manual_target(&mut self) {
        self.manual_target = None;
        self.smoother.reset();
    }

    /// True when a manual waypoint is set.
    pub fn has_manual_target(&self) -> bool {
        self.manual_target.is_some()
    }

    /// Run one guidance tick.
    ///
    /// Invoked on telemetry arrival or on a fixed cadence; calls closer
    /// together than `config.update_period_ms` are no-ops. Returns the
    /// updated status report.
    pub fn tick<I: CommandIssuer>(
        &mut self,
        now_ms: u64,
        config: &GuidanceConfig,
        telemetry: &TelemetryStore,
        params: &ParamSnapshot,
        issuer: &mut I,
    ) -> &GuidanceReport {
        if let Some(last) = self.last_tick_ms {
            if now_ms.saturating_sub(last) < config.update_period_ms {
                return &self.report;
            }
        }
        self.last_tick_ms = Some(now_ms);

        self.report.profile = config.profile;
        self.report.warnings = collect_warnings(now_ms, config, telemetry);

        let leader_fresh = telemetry.fresh(VehicleRole::Leader, now_ms, config.position_timeout_ms);
        let follower_fresh =
            telemetry.fresh(VehicleRole::Follower, now_ms, config.position_timeout_ms);

        let tracking = self.engaged && !self.override_active;
        let (leader, follower) = match (leader_fresh, follower_fresh) {
            (Some(leader), Some(follower)) if tracking => (*leader, *follower),
            _ => {
                let mode = if self.override_active {
                    GuidanceMode::ManualOverride
                } else {
                    GuidanceMode::Idle
                };
                self.apply_mode(mode);
                self.report.mode = self.mode;
                self.report.condition = if self.override_active {
                    Condition::ManualAssist
                } else if !self.engaged {
                    Condition::Paused
                } else {
                    Condition::StaleTelemetry
                };
                self.report.target = None;
                return &self.report;
            }
        };

        self.apply_mode(GuidanceMode::Tracking);
        self.report.mode = self.mode;

        let resolution = speed::resolve(config.profile, config.follower_speed_ms, params);
        if self
            .last_resolution
            .map_or(true, |previous| resolution.differs_from(&previous))
        {
            // Material change in the resolution: the previously commanded
            // speed can no longer be trusted, re-command on this tick.
            self.last_commanded_speed = None;
        }
        self.last_resolution = Some(resolution);
        self.report.resolution = Some(resolution);

        let (raw, condition) = if let Some(manual) = self.manual_target {
            let mut raw = manual;
            if resolution.velocity_override && resolution.speed_ms > 0.0 {
                raw.velocity_ned_ms = velocity_toward(
                    &follower,
                    manual.latitude,
                    manual.longitude,
                    manual.altitude_m,
                    config.altitude_frame,
                    resolution.speed_ms,
                );
            }
            (raw, Condition::ManualTarget)
        } else {
            match predict(&leader, &follower, &resolution, config) {
                Prediction::Solution(solution) => (
                    solution.target,
                    Condition::Intercepting {
                        eta_s: solution.time_to_go_s,
                        degraded: solution.degraded,
                    },
                ),
                Prediction::TooClose { range_m } => {
                    self.smoother.reset();
                    self.report.condition = Condition::WithinMinDistance { range_m };
                    self.report.target = None;
                    return &self.report;
                }
            }
        };

        let smoothed = self.smoother.filter(&raw, config.target_filter_alpha);

        // Ordering guarantee: the autopilot's speed mode must be updated
        // before the position controller receives the new target.
        let speed_changed = self.last_commanded_speed.map_or(true, |previous| {
            fabsf(previous - resolution.speed_ms) > config.speed_tolerance_ms
        });
        if speed_changed {
            issuer.change_speed(resolution.speed_ms);
            self.last_commanded_speed = Some(resolution.speed_ms);
        }
        issuer.position_target(&PositionCommand {
            latitude: smoothed.latitude,
            longitude: smoothed.longitude,
            altitude_m: smoothed.altitude_m,
            frame: config.altitude_frame,
            velocity_ned_ms: smoothed.velocity_ned_ms,
        });

        self.report.condition = condition;
        self.report.target = Some(smoothed);
        &self.report
    }

    fn apply_mode(&mut self, mode: GuidanceMode) {
        if mode == self.mode {
            return;
        }
        if mode == GuidanceMode::Tracking {
            self.smoother.reset();
        } else {
            self.last_commanded_speed = None;
        }
        self.mode = mode;
    }
}

fn collect_warnings(now_ms: u64, config: &GuidanceConfig, telemetry: &TelemetryStore) -> Warnings {
    let mut warnings = Warnings::empty();
    if telemetry
        .fresh(VehicleRole::Leader, now_ms, config.position_timeout_ms)
        .is_none()
    {
        warnings |= Warnings::LEADER_POSITION_STALE;
    }
    if telemetry
        .fresh(VehicleRole::Follower, now_ms, config.position_timeout_ms)
        .is_none()
    {
        warnings |= Warnings::FOLLOWER_POSITION_STALE;
    }
    if !telemetry.heartbeat_fresh(VehicleRole::Leader, now_ms, config.heartbeat_timeout_ms) {
        warnings |= Warnings::LEADER_HEARTBEAT_LOST;
    }
    if !telemetry.heartbeat_fresh(VehicleRole::Follower, now_ms, config.heartbeat_timeout_ms) {
        warnings |= Warnings::FOLLOWER_HEARTBEAT_LOST;
    }
    if !telemetry.armed(VehicleRole::Follower) {
        warnings |= Warnings::FOLLOWER_DISARMED;
    }
    warnings
}
