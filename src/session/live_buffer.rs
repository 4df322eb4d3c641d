//! Time-bounded rolling buffer of recently ingested events

use std::collections::VecDeque;
use std::time::Duration;

use crate::types::TelemetryEvent;

use super::types::{RecordedEvent, Session};

/// Default retention window (10 minutes)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// Rolling buffer that keeps every event whose age relative to the newest
/// event is within the retention window.
///
/// Eviction happens on push, so memory is bounded by retention times the
/// ingestion rate.
#[derive(Debug, Clone)]
pub struct LiveRingBuffer {
    events: VecDeque<RecordedEvent>,
    retention_ms: i64,
}

impl Default for LiveRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl LiveRingBuffer {
    pub fn new(retention: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            retention_ms: i64::try_from(retention.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms.max(0) as u64)
    }

    /// Append an event and evict everything that fell out of the window.
    ///
    /// A timestamp older than the current newest element is raised to it so
    /// the buffer stays ordered.
    pub fn push(&mut self, timestamp: i64, payload: TelemetryEvent) {
        let timestamp = match self.newest_timestamp() {
            Some(newest) if timestamp < newest => newest,
            _ => timestamp,
        };
        self.events.push_back(RecordedEvent::new(timestamp, payload));

        let cutoff = timestamp.saturating_sub(self.retention_ms);
        while self.events.front().is_some_and(|e| e.timestamp < cutoff) {
            self.events.pop_front();
        }
    }

    /// Independent, ordered copy of the buffer contents
    pub fn snapshot(&self) -> Session {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn newest_timestamp(&self) -> Option<i64> {
        self.events.back().map(|e| e.timestamp)
    }

    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.events.front().map(|e| e.timestamp)
    }

    /// Milliseconds between the oldest and newest retained events
    pub fn span_ms(&self) -> i64 {
        match (self.oldest_timestamp(), self.newest_timestamp()) {
            (Some(oldest), Some(newest)) => newest.saturating_sub(oldest),
            _ => 0,
        }
    }
}
