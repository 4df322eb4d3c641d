//! Telemetry ingestion over UDP
//!
//! - [`UdpListener`] - receive thread feeding decoded events to a callback
//! - [`TelemetrySender`] - client for pushing events at a listener
//! - [`SimulatedRobot`] - synthetic event source for demos

pub mod listener;
pub mod sender;

pub use listener::{ListenerStats, UdpListener};
pub use sender::{SimulatedRobot, TelemetrySender};
