//! pursuit_station - MAVLink plumbing for the pursuit guidance engine
//!
//! Wraps [`pursuit_core`] with the transport concerns the core deliberately
//! leaves out: a UDP MAVLink link, telemetry ingestion, command encoding,
//! and the tick-driving `pursuit-station` binary.

pub mod commands;
pub mod error;
pub mod ingest;
pub mod issuer;
pub mod link;

pub use error::StationError;
pub use ingest::{Ingested, TelemetryIngest, VehicleEndpoints};
pub use issuer::MavCommandIssuer;
pub use link::AutopilotLink;
