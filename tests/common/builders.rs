//! Test data builders for creating sessions

use fieldreplay_rs::{RecordedEvent, Session, TelemetryEvent};

/// Builder for sessions with explicit timestamps
pub struct SessionBuilder {
    events: Vec<RecordedEvent>,
    next_timestamp: i64,
    step_ms: i64,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_timestamp: 1_700_000_000_000,
            step_ms: 10,
        }
    }

    /// Timestamp of the first event
    pub fn starting_at(mut self, timestamp: i64) -> Self {
        self.next_timestamp = timestamp;
        self
    }

    /// Spacing used when no explicit timestamp is given
    pub fn step_ms(mut self, step_ms: i64) -> Self {
        self.step_ms = step_ms;
        self
    }

    pub fn event(mut self, payload: TelemetryEvent) -> Self {
        let timestamp = self.next_timestamp;
        self.next_timestamp += self.step_ms;
        self.events.push(RecordedEvent::new(timestamp, payload));
        self
    }

    /// Add an event at an offset from the session start
    pub fn event_at(mut self, timestamp: i64, payload: TelemetryEvent) -> Self {
        self.events.push(RecordedEvent::new(timestamp, payload));
        self.next_timestamp = timestamp + self.step_ms;
        self
    }

    pub fn position(self, x: f64, y: f64, heading: f64) -> Self {
        self.event(TelemetryEvent::position(x, y, heading))
    }

    pub fn key_value(self, key: &str, value: &str) -> Self {
        self.event(TelemetryEvent::key_value(key, value))
    }

    pub fn build(self) -> Session {
        Session::from_events(self.events)
    }
}

/// Session of `len` events with position events at `positions` and
/// key/value events everywhere else
pub fn session_with_positions(len: usize, positions: &[usize]) -> Session {
    let mut builder = SessionBuilder::new();
    for i in 0..len {
        builder = if positions.contains(&i) {
            builder.position(i as f64, i as f64, 0.0)
        } else {
            builder.key_value("index", &i.to_string())
        };
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_builder() {
        let session = SessionBuilder::new()
            .starting_at(0)
            .step_ms(100)
            .position(1.0, 2.0, 3.0)
            .key_value("a", "b")
            .event_at(350, TelemetryEvent::text("late"))
            .build();

        assert_eq!(session.len(), 3);
        assert_eq!(session.elapsed_ms_at(1), Some(100));
        assert_eq!(session.elapsed_ms_at(2), Some(350));
    }
}
