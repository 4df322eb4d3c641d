//! Event dispatch onto the presentation context
//!
//! The engine never calls into presentation code directly. It hands every
//! event to an [`EventSink`], and the default sink ([`ChannelSink`]) only
//! pushes a [`PresentationMessage`] onto an unbounded crossbeam channel. The
//! single presentation thread owns the matching [`PresentationReceiver`] and
//! applies messages in order, either by draining them itself or by pumping
//! them into a [`Presentation`] implementor.
//!
//! Playback dispatches carry a progress index so a scrubber can follow the
//! cursor; live dispatches do not.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::types::TelemetryEvent;

/// Where a dispatched event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOrigin {
    /// Forwarded straight from ingestion
    Live,
    /// Replayed from the active session
    Playback,
}

/// Messages delivered to the presentation context
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationMessage {
    /// An event to apply
    Event {
        payload: TelemetryEvent,
        origin: DispatchOrigin,
    },
    /// Playback cursor moved to this index
    Progress(usize),
    /// Playback ran to the end or was stopped
    PlaybackFinished,
}

/// Core-side hook for delivering events.
///
/// Implementations are invoked while the controller lock is held, so they
/// must return quickly and must not call back into the controller.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn dispatch(&self, payload: &TelemetryEvent, origin: DispatchOrigin);

    /// Report the playback cursor after a playback dispatch
    fn progress(&self, index: usize);

    /// Playback has ended
    fn playback_finished(&self);
}

/// [`EventSink`] that marshals everything onto a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<PresentationMessage>,
}

impl EventSink for ChannelSink {
    fn dispatch(&self, payload: &TelemetryEvent, origin: DispatchOrigin) {
        let _ = self.tx.send(PresentationMessage::Event {
            payload: payload.clone(),
            origin,
        });
    }

    fn progress(&self, index: usize) {
        let _ = self.tx.send(PresentationMessage::Progress(index));
    }

    fn playback_finished(&self) {
        let _ = self.tx.send(PresentationMessage::PlaybackFinished);
    }
}

/// Create a connected sink/receiver pair
pub fn presentation_channel() -> (ChannelSink, PresentationReceiver) {
    let (tx, rx) = unbounded();
    (ChannelSink { tx }, PresentationReceiver { rx })
}

/// Presentation-side end of the dispatch channel
#[derive(Debug)]
pub struct PresentationReceiver {
    rx: Receiver<PresentationMessage>,
}

impl PresentationReceiver {
    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<PresentationMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<PresentationMessage> {
        self.rx.try_recv().ok()
    }

    /// Block for up to `timeout` waiting for the next message.
    ///
    /// Returns `None` on timeout or once every sink has been dropped.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PresentationMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply every pending message to `presentation`, returning how many were applied.
    pub fn pump(&self, presentation: &mut impl Presentation) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            presentation.apply(msg);
            applied += 1;
        }
        applied
    }
}

/// Consumer of dispatched messages on the presentation thread
pub trait Presentation {
    fn on_event(&mut self, payload: TelemetryEvent, origin: DispatchOrigin);

    fn on_progress(&mut self, _index: usize) {}

    fn on_playback_finished(&mut self) {}

    fn apply(&mut self, msg: PresentationMessage) {
        match msg {
            PresentationMessage::Event { payload, origin } => self.on_event(payload, origin),
            PresentationMessage::Progress(index) => self.on_progress(index),
            PresentationMessage::PlaybackFinished => self.on_playback_finished(),
        }
    }
}

/// A named line as last reported
#[derive(Debug, Clone, PartialEq)]
pub struct NamedLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub style: i32,
}

/// Circle annotation pinned to the pose it arrived at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedCircle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub heading: f64,
}

/// Headless field model built from dispatched events.
///
/// Applies the upsert rules for lines and key/values and remembers the
/// latest pose and text. Nothing is drawn.
#[derive(Debug, Clone, Default)]
pub struct FieldState {
    /// Latest pose as (x, y, heading)
    pub pose: Option<(f64, f64, f64)>,
    /// Poses the robot has left behind
    pub trail: Vec<(f64, f64)>,
    pub circles: Vec<PinnedCircle>,
    pub lines: BTreeMap<String, NamedLine>,
    pub text: Option<String>,
    pub table: BTreeMap<String, String>,
    /// Last progress index reported by playback
    pub progress: Option<usize>,
    pub finished_count: usize,
    pub events_applied: usize,
}

impl FieldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, as when returning to live view
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Presentation for FieldState {
    fn on_event(&mut self, payload: TelemetryEvent, _origin: DispatchOrigin) {
        self.events_applied += 1;
        match payload {
            TelemetryEvent::Position { x, y, heading } => {
                if let Some((px, py, _)) = self.pose {
                    self.trail.push((px, py));
                }
                self.pose = Some((x, y, heading));
            }
            TelemetryEvent::Circle { radius, heading } => {
                let (x, y, _) = self.pose.unwrap_or((0.0, 0.0, 0.0));
                self.circles.push(PinnedCircle {
                    x,
                    y,
                    radius,
                    heading,
                });
            }
            TelemetryEvent::Line {
                name,
                x1,
                y1,
                x2,
                y2,
                style,
            } => {
                self.lines.insert(
                    name,
                    NamedLine {
                        x1,
                        y1,
                        x2,
                        y2,
                        style,
                    },
                );
            }
            TelemetryEvent::Text { text } => self.text = Some(text),
            TelemetryEvent::KeyValue { key, value } => {
                self.table.insert(key, value);
            }
        }
    }

    fn on_progress(&mut self, index: usize) {
        self.progress = Some(index);
    }

    fn on_playback_finished(&mut self) {
        self.finished_count += 1;
    }
}
