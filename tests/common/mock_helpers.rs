//! Sink and controller construction helpers

use std::sync::{Arc, Mutex};
use std::time::Instant;

use fieldreplay_rs::dispatch::{presentation_channel, DispatchOrigin, EventSink, PresentationReceiver};
use fieldreplay_rs::{PlaybackController, TelemetryEvent};

/// What a [`RecordingSink`] saw, with the instant it arrived
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Event(TelemetryEvent, DispatchOrigin),
    Progress(usize),
    Finished,
}

/// Sink that keeps every call with its arrival time
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<(Instant, SinkCall)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(Instant, SinkCall)> {
        self.calls.lock().unwrap().clone()
    }

    /// Progress indices in arrival order
    pub fn progress(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, call)| match call {
                SinkCall::Progress(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Arrival time of the first progress report for `index`
    pub fn progress_time(&self, index: usize) -> Option<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(_, call)| *call == SinkCall::Progress(index))
            .map(|(at, _)| *at)
    }

    pub fn finished_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| *call == SinkCall::Finished)
            .count()
    }

    pub fn events(&self) -> Vec<(TelemetryEvent, DispatchOrigin)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, call)| match call {
                SinkCall::Event(payload, origin) => Some((payload.clone(), *origin)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn push(&self, call: SinkCall) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

impl EventSink for RecordingSink {
    fn dispatch(&self, payload: &TelemetryEvent, origin: DispatchOrigin) {
        self.push(SinkCall::Event(payload.clone(), origin));
    }

    fn progress(&self, index: usize) {
        self.push(SinkCall::Progress(index));
    }

    fn playback_finished(&self) {
        self.push(SinkCall::Finished);
    }
}

/// Controller wired to a [`RecordingSink`]
pub fn recording_controller() -> (PlaybackController, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    (PlaybackController::new(sink.clone()), sink)
}

/// Controller wired to a presentation channel
pub fn channel_controller() -> (PlaybackController, PresentationReceiver) {
    let (sink, receiver) = presentation_channel();
    (PlaybackController::new(Arc::new(sink)), receiver)
}
