//! Geodetic calculation utilities
//!
//! Pure functions shared by the intercept predictor and the guidance
//! controller. Positions are WGS-84 latitude/longitude in degrees (f64);
//! distances are meters, bearings degrees true (0-360).

use libm::{asin, atan2, cos, sin, sqrt};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Calculate distance and bearing between two GPS positions using Haversine formula
///
/// # Returns
///
/// Tuple of (distance in meters, bearing in degrees 0-360)
pub fn haversine_distance_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    // Haversine formula for distance
    let sin_dlat = sin(delta_lat / 2.0);
    let sin_dlon = sin(delta_lon / 2.0);
    let a = sin_dlat * sin_dlat + cos(lat1_rad) * cos(lat2_rad) * sin_dlon * sin_dlon;
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
    let distance = EARTH_RADIUS_M * c;

    // Forward azimuth (bearing)
    let y = sin(delta_lon) * cos(lat2_rad);
    let x = cos(lat1_rad) * sin(lat2_rad) - sin(lat1_rad) * cos(lat2_rad) * cos(delta_lon);
    let bearing = atan2(y, x) * RAD_TO_DEG;
    let bearing = (bearing + 360.0) % 360.0;

    (distance, bearing)
}

/// Project a position forward along a course.
///
/// Great-circle destination point: start at (`lat`, `lon`), travel
/// `distance_m` meters on bearing `course_deg`.
pub fn offset_position(lat: f64, lon: f64, course_deg: f64, distance_m: f64) -> (f64, f64) {
    let lat_rad = lat * DEG_TO_RAD;
    let lon_rad = lon * DEG_TO_RAD;
    let course_rad = course_deg * DEG_TO_RAD;
    let angular = distance_m / EARTH_RADIUS_M;

    let dest_lat = asin(
        sin(lat_rad) * cos(angular) + cos(lat_rad) * sin(angular) * cos(course_rad),
    );
    let dest_lon = lon_rad
        + atan2(
            sin(course_rad) * sin(angular) * cos(lat_rad),
            cos(angular) - sin(lat_rad) * sin(dest_lat),
        );

    (dest_lat * RAD_TO_DEG, wrap_180(dest_lon * RAD_TO_DEG))
}

/// Normalize angle to 0-360 range
pub fn wrap_360(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

/// Normalize angle to -180 to +180 range
pub fn wrap_180(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}
