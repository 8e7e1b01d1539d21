//! Guidance engine
//!
//! # Contents
//!
//! - [`predictor`]: First-order constant-velocity intercept prediction
//! - [`smoother`]: EMA filter over the predicted target with reset semantics
//! - [`controller`]: Mode state machine and per-tick command orchestration

mod controller;
mod predictor;
mod smoother;

pub use controller::{
    CommandIssuer, Condition, GuidanceController, GuidanceMode, GuidanceReport, PositionCommand,
    Warnings,
};
pub use predictor::{predict, velocity_toward, InterceptSolution, InterceptTarget, Prediction};
pub use smoother::TargetSmoother;
