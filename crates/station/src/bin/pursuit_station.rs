//! Predictive-intercept guidance station.
//!
//! Listens for leader/follower telemetry on a MAVLink UDP endpoint, runs the
//! guidance engine at a fixed cadence, and steers the follower with
//! DO_CHANGE_SPEED + SET_POSITION_TARGET_GLOBAL_INT commands.
//!
//! Usage:
//!   cargo run -p pursuit_station --bin pursuit_station -- [OPTIONS]
//!
//! Options:
//!   --bind <ADDR:PORT>      Local UDP endpoint (default: 0.0.0.0:14550)
//!   --remote <ADDR:PORT>    Autopilot endpoint (default: discover from traffic)
//!   --leader <SYS[:COMP]>   Leader MAVLink address (default: 1:1)
//!   --follower <SYS[:COMP]> Follower MAVLink address (default: 2:1)
//!   --profile <NAME>        Speed profile: custom, cruise or max (default: custom)
//!   --speed <M/S>           Configured follower speed (default: 20)
//!   --alpha <0..1>          Target smoothing gain (default: 0.5)
//!   --alt-offset <M>        Altitude offset over the leader (default: 0)
//!   --relative-alt          Use altitude above home instead of AMSL
//!   --period <MS>           Guidance tick period (default: 500)
//!   --hold                  Start paused instead of engaged

use std::env;
use std::net::SocketAddr;
use std::process;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pursuit_core::config::{AltitudeFrame, GuidanceConfig};
use pursuit_core::guidance::{GuidanceController, GuidanceReport, Warnings};
use pursuit_core::params::ParamSnapshot;
use pursuit_core::speed::SpeedProfile;
use pursuit_core::telemetry::TelemetryStore;

use pursuit_station::commands::build_param_request_read;
use pursuit_station::{AutopilotLink, Ingested, MavCommandIssuer, TelemetryIngest, VehicleEndpoints};

/// How often missing profile parameters are re-requested.
const PARAM_REFRESH_MS: u64 = 10_000;

/// Event loop poll interval.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// GCS system id used on the link.
const STATION_SYSTEM_ID: u8 = 255;

struct Args {
    bind: String,
    remote: Option<SocketAddr>,
    endpoints: VehicleEndpoints,
    config: GuidanceConfig,
    hold: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        bind: "0.0.0.0:14550".to_string(),
        remote: None,
        endpoints: VehicleEndpoints::default(),
        config: GuidanceConfig::default(),
        hold: false,
    };

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--bind" => {
                i += 1;
                args.bind = required_arg(&raw, i, "bind").to_string();
            }
            "--remote" => {
                i += 1;
                args.remote = Some(parse_value(required_arg(&raw, i, "remote"), "remote"));
            }
            "--leader" => {
                i += 1;
                let (system, component) = parse_endpoint(required_arg(&raw, i, "leader"));
                args.endpoints.leader_system = system;
                args.endpoints.leader_component = component;
            }
            "--follower" => {
                i += 1;
                let (system, component) = parse_endpoint(required_arg(&raw, i, "follower"));
                args.endpoints.follower_system = system;
                args.endpoints.follower_component = component;
            }
            "--profile" => {
                i += 1;
                let name = required_arg(&raw, i, "profile");
                args.config.profile = SpeedProfile::from_name(name).unwrap_or_else(|| {
                    eprintln!("Error: unknown profile '{name}' (expected custom, cruise or max)");
                    process::exit(1);
                });
            }
            "--speed" => {
                i += 1;
                args.config.follower_speed_ms = parse_value(required_arg(&raw, i, "speed"), "speed");
            }
            "--alpha" => {
                i += 1;
                args.config.target_filter_alpha =
                    parse_value(required_arg(&raw, i, "alpha"), "alpha");
            }
            "--alt-offset" => {
                i += 1;
                args.config.target_alt_offset_m =
                    parse_value(required_arg(&raw, i, "alt-offset"), "alt-offset");
            }
            "--relative-alt" => {
                args.config.altitude_frame = AltitudeFrame::Relative;
            }
            "--period" => {
                i += 1;
                args.config.update_period_ms =
                    parse_value(required_arg(&raw, i, "period"), "period");
            }
            "--hold" => {
                args.hold = true;
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(e) = args.config.validate() {
        eprintln!("Error: invalid configuration: {e}");
        process::exit(1);
    }

    args
}

fn required_arg<'a>(raw: &'a [String], i: usize, name: &str) -> &'a str {
    raw.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Error: --{name} requires a value");
        process::exit(1);
    })
}

fn parse_value<T: std::str::FromStr>(value: &str, name: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for --{name}");
        process::exit(1);
    })
}

fn parse_endpoint(value: &str) -> (u8, u8) {
    let (system, component) = match value.split_once(':') {
        Some((system, component)) => (system, component),
        None => (value, "1"),
    };
    (
        parse_value(system, "leader/follower system id"),
        parse_value(component, "leader/follower component id"),
    )
}

fn print_usage() {
    eprintln!(
        "Usage: pursuit_station [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --bind <ADDR:PORT>      Local UDP endpoint (default: 0.0.0.0:14550)\n\
         \x20 --remote <ADDR:PORT>    Autopilot endpoint (default: discover from traffic)\n\
         \x20 --leader <SYS[:COMP]>   Leader MAVLink address (default: 1:1)\n\
         \x20 --follower <SYS[:COMP]> Follower MAVLink address (default: 2:1)\n\
         \x20 --profile <NAME>        Speed profile: custom, cruise or max (default: custom)\n\
         \x20 --speed <M/S>           Configured follower speed (default: 20)\n\
         \x20 --alpha <0..1>          Target smoothing gain (default: 0.5)\n\
         \x20 --alt-offset <M>        Altitude offset over the leader (default: 0)\n\
         \x20 --relative-alt          Use altitude above home instead of AMSL\n\
         \x20 --period <MS>           Guidance tick period (default: 500)\n\
         \x20 --hold                  Start paused instead of engaged\n\
         \x20 -h, --help              Show this help"
    );
}

fn warnings_text(warnings: Warnings) -> String {
    if warnings.is_empty() {
        return "none".to_string();
    }
    let mut parts = Vec::new();
    if warnings.contains(Warnings::LEADER_POSITION_STALE) {
        parts.push("leader position stale");
    }
    if warnings.contains(Warnings::FOLLOWER_POSITION_STALE) {
        parts.push("follower position stale");
    }
    if warnings.contains(Warnings::LEADER_HEARTBEAT_LOST) {
        parts.push("leader heartbeat lost");
    }
    if warnings.contains(Warnings::FOLLOWER_HEARTBEAT_LOST) {
        parts.push("follower heartbeat lost");
    }
    if warnings.contains(Warnings::FOLLOWER_DISARMED) {
        parts.push("follower disarmed");
    }
    parts.join("; ")
}

fn log_report_changes(previous: Option<&GuidanceReport>, report: &GuidanceReport) {
    if previous.map(|p| p.mode) != Some(report.mode) {
        info!("guidance mode: {}", report.mode);
    }
    if previous.map(|p| p.condition) != Some(report.condition) {
        info!("{}", report.condition);
        if let Some(target) = &report.target {
            debug!(
                "target {:.6} {:.6} alt {:.1} m",
                target.latitude, target.longitude, target.altitude_m
            );
        }
    }
    if previous.map(|p| p.warnings) != Some(report.warnings) {
        if report.warnings.is_empty() {
            info!("warnings cleared");
        } else {
            warn!("warnings: {}", warnings_text(report.warnings));
        }
    }
    let reason = report.resolution.and_then(|r| r.reason);
    if previous.map(|p| p.resolution.and_then(|r| r.reason)) != Some(reason) {
        match reason {
            Some(reason) => warn!("speed fallback: {}", reason),
            None => {
                if let Some(resolution) = report.resolution {
                    info!(
                        "speed {:.1} m/s via {}",
                        resolution.speed_ms,
                        resolution.source.tag()
                    );
                }
            }
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args();

    let mut link = AutopilotLink::new(&args.bind, args.remote, STATION_SYSTEM_ID)
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to bind {}: {e}", args.bind);
            process::exit(1);
        });

    info!(
        "pursuit station on {} (leader {}:{}, follower {}:{}, profile {})",
        args.bind,
        args.endpoints.leader_system,
        args.endpoints.leader_component,
        args.endpoints.follower_system,
        args.endpoints.follower_component,
        args.config.profile.name()
    );

    let ingest = TelemetryIngest::new(args.endpoints);
    let mut store = TelemetryStore::new();
    let mut params = ParamSnapshot::new();
    let mut controller = GuidanceController::new();
    let mut issuer = MavCommandIssuer::new(
        args.endpoints.follower_system,
        args.endpoints.follower_component,
    );

    if args.hold {
        info!("starting in hold; guidance paused");
    } else {
        controller.engage();
        info!("guidance engaged");
    }

    let wall_start = Instant::now();
    let mut last_report: Option<GuidanceReport> = None;
    let mut last_param_request_ms: Option<u64> = None;

    loop {
        let now_ms = wall_start.elapsed().as_millis() as u64;

        for (header, message) in link.poll_incoming() {
            match ingest.handle(&header, &message, now_ms, &mut store, &mut params) {
                Ingested::Parameter(name) => debug!("cached follower parameter {}", name),
                Ingested::Position(role) => debug!("position update from {}", role),
                _ => {}
            }
        }

        // Keep asking for the profile's parameters until they arrive
        let candidates = args.config.profile.candidates();
        let refresh_due = last_param_request_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= PARAM_REFRESH_MS);
        if !candidates.is_empty() && refresh_due && link.is_connected() {
            for &(name, _scale) in candidates {
                if params.get(name).is_none() {
                    if let Err(e) = link.send_message(&build_param_request_read(
                        args.endpoints.follower_system,
                        args.endpoints.follower_component,
                        name,
                    )) {
                        warn!("parameter request failed: {e}");
                    }
                }
            }
            last_param_request_ms = Some(now_ms);
        }

        let report = *controller.tick(now_ms, &args.config, &store, &params, &mut issuer);
        log_report_changes(last_report.as_ref(), &report);
        last_report = Some(report);

        for message in issuer.drain() {
            if let Err(e) = link.send_message(&message) {
                warn!("command send failed: {e}");
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
