//! Session data types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{EventKind, TelemetryEvent};

/// State of the recording/playback controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing running; live events are forwarded
    #[default]
    Idle,
    /// Capturing ingested events into the recording session
    Recording,
    /// Replaying the active session
    Playing,
    /// Replay parked at the cursor
    Paused,
}

impl PlaybackState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, PlaybackState::Recording)
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    /// Playing or paused; live events are not forwarded in these states
    pub fn is_replaying(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Recording => "Recording",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An event paired with its ingestion time in milliseconds since the UNIX epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub timestamp: i64,
    pub payload: TelemetryEvent,
}

impl RecordedEvent {
    pub fn new(timestamp: i64, payload: TelemetryEvent) -> Self {
        Self { timestamp, payload }
    }
}

/// Metadata for a captured session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Name/title of the session
    pub name: String,
    /// When the capture started
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            name: String::from("Untitled Session"),
            recorded_at: chrono::Utc::now(),
        }
    }
}

impl SessionMetadata {
    /// Create new metadata with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata named after the current local time
    pub fn timestamped(prefix: &str) -> Self {
        Self::new(format!(
            "{} {}",
            prefix,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ))
    }
}

/// An ordered, timestamped event log.
///
/// Events are kept in the order they were appended, which is non-decreasing
/// in timestamp for everything the engine produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    events: Vec<RecordedEvent>,
}

impl Session {
    /// Create a new empty session
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<RecordedEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: RecordedEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RecordedEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordedEvent> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Timestamp of the first event
    pub fn first_timestamp(&self) -> Option<i64> {
        self.events.first().map(|e| e.timestamp)
    }

    /// Milliseconds between the first event and the event at `index`
    pub fn elapsed_ms_at(&self, index: usize) -> Option<i64> {
        let first = self.first_timestamp()?;
        self.events
            .get(index)
            .map(|e| e.timestamp.saturating_sub(first).max(0))
    }

    /// Milliseconds between the first and last events
    pub fn duration_ms(&self) -> i64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp).max(0),
            _ => 0,
        }
    }

    pub fn is_position_at(&self, index: usize) -> bool {
        self.events
            .get(index)
            .is_some_and(|e| e.payload.is_position())
    }

    /// Number of events per kind
    pub fn kind_counts(&self) -> BTreeMap<EventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.payload.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Check that timestamps never go backwards
    pub fn is_time_ordered(&self) -> bool {
        self.events
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = &'a RecordedEvent;
    type IntoIter = std::slice::Iter<'a, RecordedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<RecordedEvent> for Session {
    fn from_iter<I: IntoIterator<Item = RecordedEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(ts: i64) -> RecordedEvent {
        RecordedEvent::new(ts, TelemetryEvent::position(0.0, 0.0, 0.0))
    }

    #[test]
    fn test_playback_state() {
        assert!(PlaybackState::Recording.is_recording());
        assert!(PlaybackState::Playing.is_playing());
        assert!(PlaybackState::Paused.is_paused());
        assert!(PlaybackState::Paused.is_replaying());
        assert!(!PlaybackState::Idle.is_replaying());
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
        assert_eq!(PlaybackState::Playing.to_string(), "Playing");
    }

    #[test]
    fn test_empty_session() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.first_timestamp(), None);
        assert_eq!(session.elapsed_ms_at(0), None);
        assert_eq!(session.duration_ms(), 0);
    }

    #[test]
    fn test_elapsed_is_first_event_anchored() {
        let session: Session = vec![pos(1_000), pos(1_250), pos(2_000)].into_iter().collect();
        assert_eq!(session.first_timestamp(), Some(1_000));
        assert_eq!(session.elapsed_ms_at(0), Some(0));
        assert_eq!(session.elapsed_ms_at(1), Some(250));
        assert_eq!(session.elapsed_ms_at(3), None);
        assert_eq!(session.duration_ms(), 1_000);
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let session: Session = vec![pos(i64::MIN), pos(100)].into_iter().collect();
        assert_eq!(session.elapsed_ms_at(1), Some(i64::MAX));
        assert_eq!(session.duration_ms(), i64::MAX);
    }

    #[test]
    fn test_kind_counts() {
        let mut session = Session::new();
        session.push(pos(0));
        session.push(RecordedEvent::new(1, TelemetryEvent::key_value("a", "b")));
        session.push(pos(2));

        let counts = session.kind_counts();
        assert_eq!(counts[&EventKind::Position], 2);
        assert_eq!(counts[&EventKind::KeyValue], 1);
        assert!(session.is_position_at(2));
        assert!(!session.is_position_at(1));
        assert!(!session.is_position_at(9));
    }

    #[test]
    fn test_time_ordered() {
        let ordered: Session = vec![pos(0), pos(0), pos(5)].into_iter().collect();
        assert!(ordered.is_time_ordered());
        let unordered: Session = vec![pos(5), pos(0)].into_iter().collect();
        assert!(!unordered.is_time_ordered());
    }
}
