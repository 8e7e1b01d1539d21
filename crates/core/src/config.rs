//! Guidance configuration
//!
//! All tunables of the guidance engine in one value, owned by the settings
//! collaborator (the station binary) and passed by reference into each tick.
//! The core never mutates it.

use crate::speed::SpeedProfile;

// --- Defaults ---

const DEFAULT_FOLLOWER_SPEED_MS: f32 = 20.0;
const DEFAULT_TARGET_FILTER_ALPHA: f32 = 0.5;
const DEFAULT_TARGET_ALT_OFFSET_M: f32 = 0.0;
const DEFAULT_MIN_CLOSING_MS: f32 = 1.0;
const DEFAULT_MAX_LOOKAHEAD_S: f32 = 25.0;
const DEFAULT_MIN_DISTANCE_M: f32 = 5.0;
const DEFAULT_POSITION_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 4_500;
const DEFAULT_UPDATE_PERIOD_MS: u64 = 500;
const DEFAULT_SPEED_TOLERANCE_MS: f32 = 0.25;

/// Altitude frame used for targets and altitude comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltitudeFrame {
    /// Above mean sea level
    #[default]
    Amsl,
    /// Above the home position
    Relative,
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `follower_speed_ms` must be positive
    NonPositiveFollowerSpeed,
    /// `target_filter_alpha` must be in (0, 1]
    AlphaOutOfRange,
    /// `update_period_ms` must be positive
    ZeroUpdatePeriod,
    /// `position_timeout_ms` must be positive
    ZeroPositionTimeout,
    /// `max_lookahead_s` must be positive
    NonPositiveLookahead,
    /// `min_closing_ms` must be positive
    NonPositiveMinClosing,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ConfigError::NonPositiveFollowerSpeed => "follower speed must be positive",
            ConfigError::AlphaOutOfRange => "target filter alpha must be in (0, 1]",
            ConfigError::ZeroUpdatePeriod => "update period must be positive",
            ConfigError::ZeroPositionTimeout => "position timeout must be positive",
            ConfigError::NonPositiveLookahead => "max lookahead must be positive",
            ConfigError::NonPositiveMinClosing => "min closing rate must be positive",
        };
        write!(f, "{}", text)
    }
}

/// Guidance engine configuration
#[derive(Debug, Clone)]
pub struct GuidanceConfig {
    /// Speed profile selection (custom/cruise/max)
    pub profile: SpeedProfile,
    /// Configured fallback airspeed in m/s (always used by the custom profile)
    pub follower_speed_ms: f32,
    /// EMA gain for target smoothing (1.0 = raw target, lower = more smoothing)
    pub target_filter_alpha: f32,
    /// Altitude frame for commanded targets
    pub altitude_frame: AltitudeFrame,
    /// Offset applied to the leader altitude when building targets (meters)
    pub target_alt_offset_m: f32,
    /// Minimum closing rate below which the intercept degrades (m/s)
    pub min_closing_ms: f32,
    /// Upper bound on predicted time-to-intercept (seconds)
    pub max_lookahead_s: f32,
    /// Engagement hold-off distance: no targets inside this range (meters)
    pub min_distance_m: f32,
    /// Position telemetry older than this is stale (milliseconds)
    pub position_timeout_ms: u64,
    /// Heartbeats older than this raise a warning (milliseconds)
    pub heartbeat_timeout_ms: u64,
    /// Minimum interval between guidance ticks (milliseconds)
    pub update_period_ms: u64,
    /// Speed change below this is not re-commanded (m/s)
    pub speed_tolerance_ms: f32,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            profile: SpeedProfile::Custom,
            follower_speed_ms: DEFAULT_FOLLOWER_SPEED_MS,
            target_filter_alpha: DEFAULT_TARGET_FILTER_ALPHA,
            altitude_frame: AltitudeFrame::Amsl,
            target_alt_offset_m: DEFAULT_TARGET_ALT_OFFSET_M,
            min_closing_ms: DEFAULT_MIN_CLOSING_MS,
            max_lookahead_s: DEFAULT_MAX_LOOKAHEAD_S,
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            position_timeout_ms: DEFAULT_POSITION_TIMEOUT_MS,
            heartbeat_timeout_ms: DEFAULT_HEARTBEAT_TIMEOUT_MS,
            update_period_ms: DEFAULT_UPDATE_PERIOD_MS,
            speed_tolerance_ms: DEFAULT_SPEED_TOLERANCE_MS,
        }
    }
}

impl GuidanceConfig {
    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.follower_speed_ms <= 0.0 {
            return Err(ConfigError::NonPositiveFollowerSpeed);
        }
        if self.target_filter_alpha <= 0.0 || self.target_filter_alpha > 1.0 {
            return Err(ConfigError::AlphaOutOfRange);
        }
        if self.update_period_ms == 0 {
            return Err(ConfigError::ZeroUpdatePeriod);
        }
        if self.position_timeout_ms == 0 {
            return Err(ConfigError::ZeroPositionTimeout);
        }
        if self.max_lookahead_s <= 0.0 {
            return Err(ConfigError::NonPositiveLookahead);
        }
        if self.min_closing_ms <= 0.0 {
            return Err(ConfigError::NonPositiveMinClosing);
        }
        Ok(())
    }
}
