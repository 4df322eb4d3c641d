//! Client side of the telemetry protocol
//!
//! [`TelemetrySender`] is what robot-side code (or the `simulate` command)
//! uses to push events at a listener. [`SimulatedRobot`] produces a
//! plausible event stream for demos and tests.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::error::{ReplayError, Result};
use crate::protocol::format_payload;
use crate::types::TelemetryEvent;

/// Sends encoded events to a listener, one datagram per event
#[derive(Debug)]
pub struct TelemetrySender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl TelemetrySender {
    /// Bind an ephemeral local port and resolve the target
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ReplayError::Config(format!("Could not resolve {}:{}", host, port)))?;
        Self::to_addr(target)
    }

    pub fn to_addr(target: SocketAddr) -> Result<Self> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        tracing::debug!("Telemetry sender targeting {}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, event: &TelemetryEvent) -> Result<()> {
        self.send_raw(&format_payload(event))
    }

    /// Send an already-encoded message as is
    pub fn send_raw(&self, message: &str) -> Result<()> {
        self.socket.send_to(message.as_bytes(), self.target)?;
        tracing::trace!("Sent {:?}", message);
        Ok(())
    }
}

/// Synthetic robot driving a circle around the field centre.
///
/// Each [`tick`](Self::tick) yields a position event, with a key/value
/// update every 5 ticks, a look-ahead line every 10 and a status text and
/// debug circle every 50.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    tick: u64,
    radius: f64,
    /// Degrees advanced per tick
    step_deg: f64,
}

impl Default for SimulatedRobot {
    fn default() -> Self {
        Self::new(48.0, 3.6)
    }
}

impl SimulatedRobot {
    pub fn new(radius: f64, step_deg: f64) -> Self {
        Self {
            tick: 0,
            radius,
            step_deg,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Events for the next tick
    pub fn tick(&mut self) -> Vec<TelemetryEvent> {
        let n = self.tick;
        self.tick += 1;

        let angle = (n as f64 * self.step_deg).to_radians();
        let x = self.radius * angle.cos();
        let y = self.radius * angle.sin();
        let heading = (n as f64 * self.step_deg + 90.0).rem_euclid(360.0);

        let mut events = vec![TelemetryEvent::position(x, y, heading)];
        if n % 5 == 0 {
            events.push(TelemetryEvent::key_value("tick", n.to_string()));
            events.push(TelemetryEvent::key_value(
                "heading",
                format!("{:.1}", heading),
            ));
        }
        if n % 10 == 0 {
            let ahead = angle + 0.3;
            events.push(TelemetryEvent::line(
                "lookahead",
                x,
                y,
                self.radius * ahead.cos(),
                self.radius * ahead.sin(),
                1,
            ));
        }
        if n % 50 == 0 {
            events.push(TelemetryEvent::text(format!("Lap point {}", n / 50)));
            events.push(TelemetryEvent::circle(6.0, heading));
        }
        events
    }
}
