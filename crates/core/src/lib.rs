//! pursuit_core - Pure no_std predictive-intercept guidance logic
//!
//! This crate contains the platform-agnostic guidance engine for steering a
//! follower vehicle onto a moving leader. It is host-testable and free of
//! transport dependencies; the MAVLink plumbing lives in the station crate.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Injected time**: Every entry point takes `now_ms`; nothing reads a clock
//! - **Trait seams**: Command transport injected via [`guidance::CommandIssuer`]
//!
//! # Modules
//!
//! - [`config`]: Guidance configuration with defaults and validation
//! - [`geo`]: Geodetic helpers (haversine, forward projection, angle wrapping)
//! - [`guidance`]: Intercept predictor, target smoother, guidance controller
//! - [`params`]: Cached snapshot of follower autopilot parameters
//! - [`speed`]: Speed profile resolution with fallback
//! - [`telemetry`]: Per-vehicle state store with staleness tracking

#![no_std]

pub mod config;
pub mod geo;
pub mod guidance;
pub mod params;
pub mod speed;
pub mod telemetry;
