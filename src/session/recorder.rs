//! Recording session for capturing ingested telemetry

use std::time::{Duration, Instant};

use crate::types::TelemetryEvent;

use super::types::{RecordedEvent, Session, SessionMetadata};

/// Captures events into a [`Session`] between `start` and `stop`
#[derive(Debug, Default)]
pub struct RecordingSession {
    /// Start time of the active capture
    start_time: Option<Instant>,
    /// Captured events
    session: Session,
    metadata: SessionMetadata,
}

impl RecordingSession {
    /// Create a new, idle recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.start_time.is_some()
    }

    /// Start a new capture, discarding anything captured before.
    ///
    /// Returns `false` without touching the session if already recording.
    pub fn start(&mut self, metadata: SessionMetadata) -> bool {
        if self.is_recording() {
            return false;
        }
        self.session.clear();
        self.metadata = metadata;
        self.start_time = Some(Instant::now());
        true
    }

    /// End the capture; the session is kept
    pub fn stop(&mut self) -> bool {
        self.start_time.take().is_some()
    }

    /// Append an event if recording.
    ///
    /// The timestamp is raised to the last captured one if it would go
    /// backwards.
    pub fn append(&mut self, timestamp: i64, payload: TelemetryEvent) -> bool {
        if !self.is_recording() {
            return false;
        }
        let timestamp = match self.session.events().last() {
            Some(last) if timestamp < last.timestamp => last.timestamp,
            _ => timestamp,
        };
        self.session.push(RecordedEvent::new(timestamp, payload));
        true
    }

    /// Time since `start`, while recording
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|t| t.elapsed())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Replace the captured session wholesale (loads, snapshots, clears)
    pub fn replace(&mut self, session: Session, metadata: SessionMetadata) {
        self.start_time = None;
        self.session = session;
        self.metadata = metadata;
    }

    /// Number of captured events
    pub fn event_count(&self) -> usize {
        self.session.len()
    }
}
