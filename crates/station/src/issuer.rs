//! Command boundary implementation.
//!
//! Bridges the core's [`CommandIssuer`] trait onto MAVLink: each request is
//! encoded immediately and appended to an outbound queue in call order, so
//! the core's speed-before-position guarantee survives into the byte stream.

use std::mem;
use std::time::Instant;

use mavlink::common::MavMessage;

use pursuit_core::guidance::{CommandIssuer, PositionCommand};

use crate::commands::{build_change_speed, build_manual_assist, build_position_target};

/// MAVLink-encoding command issuer with an ordered outbound queue.
pub struct MavCommandIssuer {
    target_system: u8,
    target_component: u8,
    boot: Instant,
    outbound: Vec<MavMessage>,
}

impl MavCommandIssuer {
    /// Create an issuer addressing the follower autopilot.
    pub fn new(target_system: u8, target_component: u8) -> Self {
        Self {
            target_system,
            target_component,
            boot: Instant::now(),
            outbound: Vec::new(),
        }
    }

    /// Take the queued messages, preserving order.
    pub fn drain(&mut self) -> Vec<MavMessage> {
        mem::take(&mut self.outbound)
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    fn time_boot_ms(&self) -> u32 {
        (self.boot.elapsed().as_millis() % u32::MAX as u128) as u32
    }
}

impl CommandIssuer for MavCommandIssuer {
    fn change_speed(&mut self, speed_ms: f32) {
        self.outbound.push(build_change_speed(
            self.target_system,
            self.target_component,
            speed_ms,
        ));
    }

    fn position_target(&mut self, command: &PositionCommand) {
        self.outbound.push(build_position_target(
            command,
            self.target_system,
            self.target_component,
            self.time_boot_ms(),
        ));
    }

    fn manual_assist_mode(&mut self) {
        self.outbound
            .push(build_manual_assist(self.target_system, self.target_component));
    }
}
