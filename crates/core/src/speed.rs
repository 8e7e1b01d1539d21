//! Speed profile resolution
//!
//! Turns the selected speed profile plus the follower's parameter snapshot
//! into a concrete commanded airspeed, with graceful fallback to the
//! configured speed when the profile's parameters are missing.

use crate::params::ParamSnapshot;

/// Floor applied to non-positive resolutions so guidance stays usable.
const MIN_SPEED_MS: f32 = 0.1;

/// Value difference that counts as a material change between resolutions.
const CHANGE_TOLERANCE_MS: f32 = 0.1;

/// Cruise profile candidates in priority order, with unit scale to m/s.
const CRUISE_CANDIDATES: [(&str, f32); 3] = [
    ("AIRSPEED_CRUISE", 1.0),
    ("AIRSPEED_TRIM", 1.0),
    ("TRIM_ARSPD_CM", 0.01), // cm/s
];

/// Max profile candidates in priority order, with unit scale to m/s.
const MAX_CANDIDATES: [(&str, f32); 2] = [
    ("AIRSPEED_MAX", 1.0),
    ("ARSPD_FBW_MAX", 1.0),
];

const CRUISE_FALLBACK_REASON: &str =
    "cruise parameters unavailable (AIRSPEED_CRUISE, AIRSPEED_TRIM, TRIM_ARSPD_CM); \
     using configured follower speed";
const MAX_FALLBACK_REASON: &str =
    "max parameters unavailable (AIRSPEED_MAX, ARSPD_FBW_MAX); \
     using configured follower speed, velocity override disabled";
const FLOORED_REASON: &str = "non-positive speed floored to 0.1 m/s";

/// Named policy for selecting the follower's commanded airspeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedProfile {
    /// Use the configured follower speed verbatim
    #[default]
    Custom,
    /// Use the follower's cruise airspeed parameters
    Cruise,
    /// Use the follower's maximum airspeed parameters and engage
    /// velocity override
    Max,
}

impl SpeedProfile {
    /// Lowercase profile name for status and settings surfaces.
    pub fn name(self) -> &'static str {
        match self {
            SpeedProfile::Custom => "custom",
            SpeedProfile::Cruise => "cruise",
            SpeedProfile::Max => "max",
        }
    }

    /// Parse a profile name as accepted on the settings surface.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "custom" => Some(SpeedProfile::Custom),
            "cruise" => Some(SpeedProfile::Cruise),
            "max" => Some(SpeedProfile::Max),
            _ => None,
        }
    }

    /// Parameter candidates this profile consults, in priority order,
    /// paired with the scale converting the stored value to m/s.
    pub fn candidates(self) -> &'static [(&'static str, f32)] {
        match self {
            SpeedProfile::Custom => &[],
            SpeedProfile::Cruise => &CRUISE_CANDIDATES,
            SpeedProfile::Max => &MAX_CANDIDATES,
        }
    }
}

/// Where a resolved speed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedSource {
    /// The configured follower speed, selected by the custom profile
    Configured,
    /// A follower autopilot parameter
    Parameter(&'static str),
    /// The configured follower speed, reached by fallback
    Fallback,
}

impl SpeedSource {
    /// Short tag for status output.
    pub fn tag(self) -> &'static str {
        match self {
            SpeedSource::Configured => "configured",
            SpeedSource::Parameter(name) => name,
            SpeedSource::Fallback => "fallback",
        }
    }
}

/// Result of resolving a speed profile against the parameter snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedResolution {
    /// Profile that was resolved
    pub profile: SpeedProfile,
    /// Commanded airspeed in m/s
    pub speed_ms: f32,
    /// Which parameter satisfied the profile, or fallback
    pub source: SpeedSource,
    /// True when the position target should carry a velocity vector
    pub velocity_override: bool,
    /// Operator-readable reason when fallback or flooring occurred
    pub reason: Option<&'static str>,
}

impl SpeedResolution {
    /// True when the profile's parameters were unavailable.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, SpeedSource::Fallback)
    }

    /// Material change detection: a change in profile, source, override
    /// flag, or more than 0.1 m/s of value means the previously commanded
    /// speed can no longer be trusted.
    pub fn differs_from(&self, other: &SpeedResolution) -> bool {
        self.profile != other.profile
            || self.source != other.source
            || self.velocity_override != other.velocity_override
            || libm::fabsf(self.speed_ms - other.speed_ms) > CHANGE_TOLERANCE_MS
    }
}

/// Resolve the commanded airspeed for `profile`.
///
/// Deterministic given the same snapshot; retains no state. The first
/// candidate parameter that is present, finite and positive wins.
pub fn resolve(
    profile: SpeedProfile,
    follower_speed_ms: f32,
    params: &ParamSnapshot,
) -> SpeedResolution {
    let mut resolution = match profile {
        SpeedProfile::Custom => SpeedResolution {
            profile,
            speed_ms: follower_speed_ms,
            source: SpeedSource::Configured,
            velocity_override: false,
            reason: None,
        },
        SpeedProfile::Cruise => {
            resolve_candidates(profile, follower_speed_ms, params, false, CRUISE_FALLBACK_REASON)
        }
        SpeedProfile::Max => {
            resolve_candidates(profile, follower_speed_ms, params, true, MAX_FALLBACK_REASON)
        }
    };

    if resolution.speed_ms <= 0.0 {
        resolution.speed_ms = MIN_SPEED_MS;
        resolution.reason = Some(resolution.reason.unwrap_or(FLOORED_REASON));
    }
    resolution
}

fn resolve_candidates(
    profile: SpeedProfile,
    follower_speed_ms: f32,
    params: &ParamSnapshot,
    override_on_hit: bool,
    fallback_reason: &'static str,
) -> SpeedResolution {
    for &(name, scale) in profile.candidates() {
        let Some(raw) = params.get(name) else {
            continue;
        };
        let scaled = raw * scale;
        if !scaled.is_finite() || scaled <= 0.0 {
            continue;
        }
        return SpeedResolution {
            profile,
            speed_ms: scaled,
            source: SpeedSource::Parameter(name),
            velocity_override: override_on_hit,
            reason: None,
        };
    }

    SpeedResolution {
        profile,
        speed_ms: follower_speed_ms,
        source: SpeedSource::Fallback,
        velocity_override: false,
        reason: Some(fallback_reason),
    }
}
