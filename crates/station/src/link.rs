//! MAVLink UDP link to the autopilot network.
//!
//! Provides a non-blocking UDP socket speaking MAVLink v2, used both to
//! receive telemetry from the leader and follower and to send guidance
//! commands to the follower.

use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};

use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;

use crate::error::StationError;

/// Ground-station MAVLink UDP connection.
///
/// The remote endpoint may be configured explicitly or discovered from the
/// first inbound datagram (telemetry routers typically dial in first).
pub struct AutopilotLink {
    socket: UdpSocket,
    remote: Option<SocketAddr>,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    recv_buf: Vec<u8>,
}

impl AutopilotLink {
    /// Bind `bind_addr` in non-blocking mode.
    ///
    /// `remote` is the endpoint commands are sent to; pass `None` to latch
    /// onto the first peer that sends us a datagram.
    pub fn new(
        bind_addr: &str,
        remote: Option<SocketAddr>,
        system_id: u8,
    ) -> Result<Self, StationError> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            remote,
            system_id,
            component_id: 190, // MAV_COMP_ID_MISSIONPLANNER
            sequence: 0,
            recv_buf: vec![0u8; 280],
        })
    }

    /// Try to receive and parse incoming MAVLink messages.
    ///
    /// When no remote endpoint is configured, the first sender address is
    /// stored as the outgoing endpoint.
    pub fn poll_incoming(&mut self) -> Vec<(MavHeader, MavMessage)> {
        let mut messages = Vec::new();
        loop {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((len, addr)) => {
                    if self.remote.is_none() {
                        self.remote = Some(addr);
                    }
                    if let Some(msg) = self.parse_datagram(&self.recv_buf[..len]) {
                        messages.push(msg);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
        messages
    }

    /// Send a MAVLink v2 message to the remote endpoint.
    ///
    /// Does nothing if no remote has been configured or discovered yet.
    pub fn send_message(&mut self, msg: &MavMessage) -> Result<(), StationError> {
        let Some(addr) = self.remote else {
            return Ok(());
        };

        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| StationError::Encode(format!("{e:?}")))?;

        self.socket.send_to(&buf.into_inner(), addr)?;
        Ok(())
    }

    /// Whether an endpoint is known (configured or discovered).
    pub fn is_connected(&self) -> bool {
        self.remote.is_some()
    }

    /// Local socket address (useful for tests and logs).
    pub fn local_addr(&self) -> Result<SocketAddr, StationError> {
        Ok(self.socket.local_addr()?)
    }

    fn parse_datagram(&self, data: &[u8]) -> Option<(MavHeader, MavMessage)> {
        let cursor = Cursor::new(data);
        let mut reader = PeekReader::new(cursor);
        mavlink::read_v2_msg::<MavMessage, _>(&mut reader).ok()
    }
}
