//! Session recording and playback module
//!
//! This module owns the engine: the rolling live buffer, explicit recordings,
//! recording files and the [`PlaybackController`] that replays a session at
//! its original timing.
//!
//! # Features
//!
//! - Keep the last ten minutes of telemetry for instant replay
//! - Record sessions on demand and save them as line-oriented text files
//! - Play back at original timing with pause, stop, step and seek
//! - Step and seek land on position events so every stop is a full frame

pub mod file_format;
pub mod live_buffer;
pub mod player;
pub mod recorder;
pub mod types;

pub use file_format::{load_session, save_session, SessionWriter};
pub use live_buffer::LiveRingBuffer;
pub use player::PlaybackController;
pub use recorder::RecordingSession;
pub use types::{PlaybackState, RecordedEvent, Session, SessionMetadata};
