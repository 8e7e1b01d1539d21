//! Target exponential moving average (EMA) filter
//!
//! Smooths the predicted intercept target before it is commanded, so jitter
//! in leader telemetry does not translate into position-target churn.

use super::predictor::InterceptTarget;

/// Exponential moving average filter over intercept targets.
///
/// Each field (latitude, longitude, altitude, velocity components) is
/// filtered independently. The velocity vector is emitted only when the raw
/// input carries one.
///
/// # Configuration
/// - `alpha = 1.0`: no filtering (pass-through)
/// - lower alpha: more smoothing
#[derive(Debug, Default)]
pub struct TargetSmoother {
    state: Option<InterceptTarget>,
}

impl TargetSmoother {
    /// Create a smoother with no stored state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the EMA filter to a raw target.
    ///
    /// The first call after a reset returns the raw target unchanged and
    /// stores it as the new baseline.
    pub fn filter(&mut self, raw: &InterceptTarget, alpha: f32) -> InterceptTarget {
        let alpha = alpha.clamp(0.0, 1.0);
        let smoothed = match &self.state {
            Some(prev) if alpha < 1.0 => InterceptTarget {
                latitude: ema64(prev.latitude, raw.latitude, alpha),
                longitude: ema64(prev.longitude, raw.longitude, alpha),
                altitude_m: ema32(prev.altitude_m, raw.altitude_m, alpha),
                velocity_ned_ms: match (prev.velocity_ned_ms, raw.velocity_ned_ms) {
                    (Some(p), Some(r)) => Some([
                        ema32(p[0], r[0], alpha),
                        ema32(p[1], r[1], alpha),
                        ema32(p[2], r[2], alpha),
                    ]),
                    // A vector arriving after a gap re-seeds rather than
                    // interpolating against stale data
                    (None, Some(r)) => Some(r),
                    (_, None) => None,
                },
            },
            _ => *raw,
        };
        self.state = Some(smoothed);
        smoothed
    }

    /// Clear stored state. The next `filter` call passes its input through.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Current smoothed target, if one has been produced since the last reset.
    pub fn current(&self) -> Option<&InterceptTarget> {
        self.state.as_ref()
    }
}

fn ema64(prev: f64, raw: f64, alpha: f32) -> f64 {
    prev + alpha as f64 * (raw - prev)
}

fn ema32(prev: f32, raw: f32, alpha: f32) -> f32 {
    prev + alpha * (raw - prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(lat: f64, lon: f64, alt: f32) -> InterceptTarget {
        InterceptTarget {
            latitude: lat,
            longitude: lon,
            altitude_m: alt,
            velocity_ned_ms: None,
        }
    }

    #[test]
    fn test_first_call_returns_raw_target() {
        let mut smoother = TargetSmoother::new();
        let raw = target(35.6762, 139.6503, 120.0);

        let smoothed = smoother.filter(&raw, 0.3);
        assert_eq!(smoothed, raw);
        assert_eq!(smoother.current(), Some(&raw));
    }

    #[test]
    fn test_ema_moves_toward_raw() {
        let mut smoother = TargetSmoother::new();
        smoother.filter(&target(0.0, 0.0, 100.0), 0.5);

        let smoothed = smoother.filter(&target(1.0, 2.0, 200.0), 0.5);
        assert!((smoothed.latitude - 0.5).abs() < 1e-9);
        assert!((smoothed.longitude - 1.0).abs() < 1e-9);
        assert!((smoothed.altitude_m - 150.0).abs() < 0.001);
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        for alpha in [0.1, 0.3, 0.5, 0.9, 1.0] {
            let mut smoother = TargetSmoother::new();
            smoother.filter(&target(0.0, 0.0, 0.0), alpha);

            let goal = target(1.0, 1.0, 100.0);
            let mut last_error = f64::INFINITY;
            for _ in 0..50 {
                let smoothed = smoother.filter(&goal, alpha);
                let error = (goal.latitude - smoothed.latitude).abs();
                assert!(
                    error <= last_error + 1e-12,
                    "alpha {} did not converge monotonically",
                    alpha
                );
                last_error = error;
            }
            assert!(
                last_error < 0.01,
                "alpha {} left error {}",
                alpha,
                last_error
            );
        }
    }

    #[test]
    fn test_alpha_one_passes_through() {
        let mut smoother = TargetSmoother::new();
        smoother.filter(&target(0.0, 0.0, 0.0), 1.0);

        let raw = target(1.0, 2.0, 300.0);
        let smoothed = smoother.filter(&raw, 1.0);
        assert_eq!(smoothed, raw);
    }

    #[test]
    fn test_reset_reseeds_from_raw() {
        let mut smoother = TargetSmoother::new();
        smoother.filter(&target(0.0, 0.0, 0.0), 0.2);
        smoother.filter(&target(1.0, 1.0, 100.0), 0.2);

        smoother.reset();
        assert!(smoother.current().is_none());

        let raw = target(5.0, 6.0, 700.0);
        let smoothed = smoother.filter(&raw, 0.2);
        assert_eq!(smoothed, raw, "first post-reset output must equal raw");
    }

    #[test]
    fn test_velocity_smoothed_when_present_on_both() {
        let mut smoother = TargetSmoother::new();
        let mut first = target(0.0, 0.0, 0.0);
        first.velocity_ned_ms = Some([10.0, 0.0, 0.0]);
        smoother.filter(&first, 0.5);

        let mut second = target(0.0, 0.0, 0.0);
        second.velocity_ned_ms = Some([20.0, 4.0, -2.0]);
        let smoothed = smoother.filter(&second, 0.5);

        let velocity = smoothed.velocity_ned_ms.unwrap();
        assert!((velocity[0] - 15.0).abs() < 0.001);
        assert!((velocity[1] - 2.0).abs() < 0.001);
        assert!((velocity[2] - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_velocity_absent_from_raw_is_absent_from_output() {
        let mut smoother = TargetSmoother::new();
        let mut first = target(0.0, 0.0, 0.0);
        first.velocity_ned_ms = Some([10.0, 0.0, 0.0]);
        smoother.filter(&first, 0.5);

        let second = target(0.0, 0.0, 0.0);
        let smoothed = smoother.filter(&second, 0.5);
        assert!(smoothed.velocity_ned_ms.is_none());
    }

    #[test]
    fn test_velocity_reseeds_after_gap() {
        let mut smoother = TargetSmoother::new();
        smoother.filter(&target(0.0, 0.0, 0.0), 0.5);

        let mut with_velocity = target(0.0, 0.0, 0.0);
        with_velocity.velocity_ned_ms = Some([8.0, 0.0, 0.0]);
        let smoothed = smoother.filter(&with_velocity, 0.5);

        // No previous vector to interpolate against: take raw verbatim
        assert_eq!(smoothed.velocity_ned_ms, Some([8.0, 0.0, 0.0]));
    }

    #[test]
    fn test_out_of_range_alpha_clamped() {
        let mut smoother = TargetSmoother::new();
        smoother.filter(&target(0.0, 0.0, 0.0), 2.0);
        let raw = target(1.0, 1.0, 100.0);
        // alpha > 1 behaves as pass-through
        assert_eq!(smoother.filter(&raw, 2.0), raw);
    }
}
