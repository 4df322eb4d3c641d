//! # fieldreplay-rs: telemetry recording and replay for field robots
//!
//! A robot pushes small text messages over UDP (poses, debug circles, named
//! lines, status text and key/value pairs). This crate ingests that stream,
//! keeps a rolling ten-minute window of it, records sessions on demand and
//! replays any session at its original timing with pause, step and seek.
//!
//! ## Architecture
//!
//! - **Ingest**: a UDP listener thread decodes datagrams ([`protocol`]) and feeds the controller
//! - **Session**: [`PlaybackController`] owns the live buffer, recording and paced replay
//! - **Dispatch**: events reach the presentation side through an [`EventSink`], by default a crossbeam channel
//! - **Config**: TOML runtime configuration and a JSON app state in the platform data directory
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fieldreplay_rs::{
//!     config::AppConfig,
//!     dispatch::{presentation_channel, FieldState},
//!     ingest::UdpListener,
//!     PlaybackController,
//! };
//!
//! let config = AppConfig::default();
//! let (sink, receiver) = presentation_channel();
//! let controller = Arc::new(PlaybackController::with_config(
//!     Arc::new(sink),
//!     &config.playback,
//!     &config.buffer,
//! ));
//!
//! let ingest = controller.clone();
//! let _listener = UdpListener::bind(&config.listener, move |event| ingest.ingest(event))?;
//!
//! let mut field = FieldState::new();
//! loop {
//!     receiver.pump(&mut field);
//!     // ...
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod protocol;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, AppState};
pub use dispatch::{presentation_channel, EventSink, FieldState, PresentationMessage};
pub use error::{ReplayError, Result};
pub use session::{PlaybackController, PlaybackState, RecordedEvent, Session};
pub use types::{EventKind, TelemetryEvent};
