//! Core telemetry types
//!
//! A [`TelemetryEvent`] is one unit of data pushed by the robot. The engine
//! only looks at the variant tag; the payload fields are carried through
//! untouched for whoever consumes them.
//!
//! # Event kinds
//!
//! - [`TelemetryEvent::Position`] - robot pose, the only kind that counts as a playback frame
//! - [`TelemetryEvent::Circle`] - debug circle anchored at the current pose
//! - [`TelemetryEvent::Line`] - named segment, later lines with the same name replace earlier ones
//! - [`TelemetryEvent::Text`] - transient message near the robot
//! - [`TelemetryEvent::KeyValue`] - upsert into the telemetry table

use serde::{Deserialize, Serialize};

/// A single telemetry payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Robot pose in field inches and degrees
    Position { x: f64, y: f64, heading: f64 },
    /// Debug circle drawn at the robot's pose when it arrives
    Circle { radius: f64, heading: f64 },
    /// Named, styled line segment
    Line {
        name: String,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        style: i32,
    },
    /// Free-form text message
    Text { text: String },
    /// Key/value pair for the telemetry table
    KeyValue { key: String, value: String },
}

impl TelemetryEvent {
    pub fn position(x: f64, y: f64, heading: f64) -> Self {
        TelemetryEvent::Position { x, y, heading }
    }

    pub fn circle(radius: f64, heading: f64) -> Self {
        TelemetryEvent::Circle { radius, heading }
    }

    pub fn line(name: impl Into<String>, x1: f64, y1: f64, x2: f64, y2: f64, style: i32) -> Self {
        TelemetryEvent::Line {
            name: name.into(),
            x1,
            y1,
            x2,
            y2,
            style,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        TelemetryEvent::Text { text: text.into() }
    }

    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        TelemetryEvent::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The variant tag of this event
    pub fn kind(&self) -> EventKind {
        match self {
            TelemetryEvent::Position { .. } => EventKind::Position,
            TelemetryEvent::Circle { .. } => EventKind::Circle,
            TelemetryEvent::Line { .. } => EventKind::Line,
            TelemetryEvent::Text { .. } => EventKind::Text,
            TelemetryEvent::KeyValue { .. } => EventKind::KeyValue,
        }
    }

    /// Positions are the only valid stopping points for step and seek
    pub fn is_position(&self) -> bool {
        matches!(self, TelemetryEvent::Position { .. })
    }
}

/// Variant tag of a [`TelemetryEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Position,
    Circle,
    Line,
    Text,
    KeyValue,
}

impl EventKind {
    /// Wire prefix used by the text protocol
    pub fn prefix(&self) -> &'static str {
        match self {
            EventKind::Position => "pos",
            EventKind::Circle => "cir",
            EventKind::Line => "line",
            EventKind::Text => "txt",
            EventKind::KeyValue => "kv",
        }
    }

    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Position,
            EventKind::Circle,
            EventKind::Line,
            EventKind::Text,
            EventKind::KeyValue,
        ]
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Position => write!(f, "Position"),
            EventKind::Circle => write!(f, "Circle"),
            EventKind::Line => write!(f, "Line"),
            EventKind::Text => write!(f, "Text"),
            EventKind::KeyValue => write!(f, "KeyValue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(TelemetryEvent::position(1.0, 2.0, 3.0).kind(), EventKind::Position);
        assert_eq!(TelemetryEvent::circle(4.0, 90.0).kind(), EventKind::Circle);
        assert_eq!(
            TelemetryEvent::line("path", 0.0, 0.0, 1.0, 1.0, 2).kind(),
            EventKind::Line
        );
        assert_eq!(TelemetryEvent::text("hi").kind(), EventKind::Text);
        assert_eq!(TelemetryEvent::key_value("a", "b").kind(), EventKind::KeyValue);
    }

    #[test]
    fn test_is_position() {
        assert!(TelemetryEvent::position(0.0, 0.0, 0.0).is_position());
        assert!(!TelemetryEvent::key_value("battery", "12.1").is_position());
    }

    #[test]
    fn test_prefixes_are_unique() {
        let mut prefixes: Vec<_> = EventKind::all().iter().map(|k| k.prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), EventKind::all().len());
    }

    #[test]
    fn test_json_tagging() {
        let json = serde_json::to_string(&TelemetryEvent::text("go")).unwrap();
        assert!(json.contains("\"kind\":\"text\""));
    }
}
