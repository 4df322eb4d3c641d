//! Playback controller: recording, live buffering and paced replay
//!
//! [`PlaybackController`] is the single owner of the engine's mutable state.
//! Everything it guards (state, cursor, active session, live buffer, recorder)
//! sits behind one mutex, so every public method can be called from any
//! thread. Replay runs on at most one pacing thread which re-checks the state
//! after every wake and before every dispatch.
//!
//! # State machine
//!
//! ```text
//!            start_recording            play
//!   Idle  <------------------>  Recording      Idle ----> Playing <--> Paused
//!    ^        stop_recording                    ^  stop / end  |          |
//!    +------------------------------------------+--------------+----------+
//! ```
//!
//! Operations that make no sense in the current state are silently ignored.
//!
//! # Cancellation
//!
//! Each pacing loop carries the generation it was started with. Stopping
//! bumps the generation and wakes the loop, then waits (bounded by
//! [`PlaybackConfig::join_timeout`]) for it to report that it has exited.
//! Sleeping is done on the shared condition variable, so pause and stop take
//! effect immediately rather than after the current inter-event delay.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::{BufferConfig, PlaybackConfig};
use crate::dispatch::{DispatchOrigin, EventSink};
use crate::error::Result;
use crate::types::TelemetryEvent;

use super::file_format;
use super::live_buffer::LiveRingBuffer;
use super::recorder::RecordingSession;
use super::types::{PlaybackState, Session, SessionMetadata};

/// Current wall clock in milliseconds since the UNIX epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Thread-safe recording and playback engine
pub struct PlaybackController {
    shared: Arc<Shared>,
    min_delay: Duration,
    join_timeout: Duration,
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
    sink: Arc<dyn EventSink>,
}

struct Inner {
    state: PlaybackState,
    cursor: usize,
    /// Holds the active session, whether captured or loaded
    recorder: RecordingSession,
    live: LiveRingBuffer,
    /// Last ingestion timestamp handed out, for monotonic stamping
    last_timestamp: i64,
    /// Incremented whenever the current pacing loop must exit
    generation: u64,
    /// Pacing loops that have been spawned and not yet exited
    active_loops: usize,
    pacer: Option<JoinHandle<()>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the cursor to `index` and deliver that event
    fn dispatch_at(&self, inner: &mut Inner, index: usize) {
        if index >= inner.recorder.event_count() {
            return;
        }
        inner.cursor = index;
        if let Some(event) = inner.recorder.session().get(index) {
            tracing::trace!("Playback dispatch #{} ({})", index, event.payload.kind());
            self.sink.dispatch(&event.payload, DispatchOrigin::Playback);
            self.sink.progress(index);
        }
    }

    fn dispatch_range(&self, inner: &mut Inner, range: std::ops::RangeInclusive<usize>) {
        for index in range {
            self.dispatch_at(inner, index);
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("PlaybackController")
            .field("state", &inner.state)
            .field("cursor", &inner.cursor)
            .field("events", &inner.recorder.event_count())
            .field("live_buffer", &inner.live.len())
            .finish()
    }
}

impl PlaybackController {
    /// Create a controller with default buffer and pacing settings
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(sink, &PlaybackConfig::default(), &BufferConfig::default())
    }

    pub fn with_config(
        sink: Arc<dyn EventSink>,
        playback: &PlaybackConfig,
        buffer: &BufferConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: PlaybackState::Idle,
                    cursor: 0,
                    recorder: RecordingSession::new(),
                    live: LiveRingBuffer::new(buffer.retention()),
                    last_timestamp: i64::MIN,
                    generation: 0,
                    active_loops: 0,
                    pacer: None,
                }),
                wake: Condvar::new(),
                sink,
            }),
            min_delay: playback.min_delay(),
            join_timeout: playback.join_timeout(),
        }
    }

    // ==================== Ingestion ====================

    /// Ingest an event stamped with the current wall clock
    pub fn ingest(&self, payload: TelemetryEvent) {
        self.ingest_at(now_millis(), payload);
    }

    /// Ingest an event with an explicit timestamp.
    ///
    /// The event always goes to the live buffer, to the recording when one is
    /// active, and straight to the sink unless a replay is playing or paused.
    /// Timestamps never go backwards: an earlier one is raised to the last.
    pub fn ingest_at(&self, timestamp: i64, payload: TelemetryEvent) {
        let mut inner = self.shared.lock();
        let timestamp = timestamp.max(inner.last_timestamp);
        inner.last_timestamp = timestamp;

        inner.live.push(timestamp, payload.clone());
        if inner.state.is_recording() {
            inner.recorder.append(timestamp, payload.clone());
        }
        if !inner.state.is_replaying() {
            self.shared.sink.dispatch(&payload, DispatchOrigin::Live);
        }
    }

    // ==================== Recording ====================

    /// Begin a fresh recording. Stops any replay first; no-op while recording.
    pub fn start_recording(&self) {
        let mut inner = self.shared.lock();
        if inner.state.is_recording() {
            return;
        }
        inner = self.stop_playback_locked(inner);
        inner
            .recorder
            .start(SessionMetadata::timestamped("Recording"));
        inner.cursor = 0;
        inner.state = PlaybackState::Recording;
        tracing::info!("Recording started");
    }

    /// End the current recording; the captured session becomes the active one
    pub fn stop_recording(&self) {
        let mut inner = self.shared.lock();
        if !inner.state.is_recording() {
            return;
        }
        inner.recorder.stop();
        inner.state = PlaybackState::Idle;
        inner.cursor = 0;
        tracing::info!(
            "Recording stopped ({} events)",
            inner.recorder.event_count()
        );
    }

    // ==================== Loading ====================

    /// Replace the active session
    pub fn load_session(&self, session: Session) {
        self.load_with_metadata(session, SessionMetadata::default());
    }

    pub fn load_with_metadata(&self, session: Session, metadata: SessionMetadata) {
        let mut inner = self.shared.lock();
        inner = self.stop_playback_locked(inner);
        let count = session.len();
        inner.recorder.replace(session, metadata);
        inner.cursor = 0;
        inner.state = PlaybackState::Idle;
        tracing::debug!("Loaded session with {} events", count);
    }

    /// Make a snapshot of the live buffer the active session (instant replay)
    pub fn load_from_live_buffer(&self) {
        let snapshot = self.shared.lock().live.snapshot();
        tracing::info!("Loaded {} events from live buffer", snapshot.len());
        self.load_with_metadata(snapshot, SessionMetadata::timestamped("Instant replay"));
    }

    /// Load a recording file; the active session is untouched on error
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let session = file_format::load_session(path)?;
        let count = session.len();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Recording".to_string());
        self.load_with_metadata(session, SessionMetadata::new(name));
        Ok(count)
    }

    /// Save the active session to a recording file
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let session = self.session();
        file_format::save_session(path, &session)?;
        Ok(session.len())
    }

    /// Drop the active session and return to live view
    pub fn clear_session(&self) {
        self.load_session(Session::new());
    }

    // ==================== Playback ====================

    /// Start or resume playback.
    ///
    /// Rewinds to the first event when the cursor is on the last one.
    pub fn play(&self) {
        let mut inner = self.shared.lock();
        let len = inner.recorder.event_count();
        if len == 0 || inner.state.is_recording() || inner.state.is_playing() {
            return;
        }

        let mut rewound = false;
        if inner.cursor >= len - 1 {
            inner.cursor = 0;
            rewound = true;
        }

        if inner.state.is_paused() && !rewound && inner.active_loops > 0 {
            inner.state = PlaybackState::Playing;
            self.shared.wake.notify_all();
            tracing::debug!("Playback resumed at #{}", inner.cursor);
            return;
        }

        if inner.state.is_paused() {
            inner = self.retire_pacer(inner);
        }
        inner.state = PlaybackState::Playing;
        self.spawn_pacer(&mut inner);
    }

    /// Park playback at the cursor
    pub fn pause(&self) {
        let mut inner = self.shared.lock();
        if !inner.state.is_playing() {
            return;
        }
        inner.state = PlaybackState::Paused;
        self.shared.wake.notify_all();
        tracing::debug!("Playback paused at #{}", inner.cursor);
    }

    /// End playback, keeping the cursor where it is
    pub fn stop(&self) {
        let inner = self.shared.lock();
        drop(self.stop_playback_locked(inner));
    }

    /// Move to the next position event, dispatching everything passed over
    pub fn step_forward(&self) {
        let mut inner = self.shared.lock();
        let len = inner.recorder.event_count();
        if len == 0 || inner.state.is_recording() {
            return;
        }
        inner = self.stop_playback_locked(inner);
        if inner.cursor >= len - 1 {
            return;
        }

        let start = inner.cursor + 1;
        let target = next_position(inner.recorder.session(), inner.cursor).unwrap_or(len - 1);
        self.shared.dispatch_range(&mut inner, start..=target);
    }

    /// Move to the previous position event.
    ///
    /// Events between the position before the target and the target are
    /// re-dispatched so annotations attached to that frame are restored.
    pub fn step_backward(&self) {
        let mut inner = self.shared.lock();
        if inner.recorder.session().is_empty() || inner.state.is_recording() {
            return;
        }
        inner = self.stop_playback_locked(inner);
        if inner.cursor == 0 {
            return;
        }

        let session = inner.recorder.session();
        let target = previous_position(session, inner.cursor).unwrap_or(0);
        let start = window_start(session, target);
        self.shared.dispatch_range(&mut inner, start..=target);
    }

    /// Jump to the position event closest to `index`
    pub fn seek_to(&self, index: usize) {
        let mut inner = self.shared.lock();
        let len = inner.recorder.event_count();
        if len == 0 || inner.state.is_recording() {
            return;
        }
        inner = self.stop_playback_locked(inner);

        let session = inner.recorder.session();
        let clamped = index.min(len - 1);
        let target = closest_position(session, clamped).unwrap_or(clamped);
        let start = window_start(session, target);
        tracing::debug!("Seek {} -> #{}", index, target);
        self.shared.dispatch_range(&mut inner, start..=target);
    }

    // ==================== Queries ====================

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn has_session(&self) -> bool {
        !self.shared.lock().recorder.session().is_empty()
    }

    /// Playback cursor, `None` when the session is empty
    pub fn cursor(&self) -> Option<usize> {
        let inner = self.shared.lock();
        (!inner.recorder.session().is_empty()).then_some(inner.cursor)
    }

    pub fn event_count(&self) -> usize {
        self.shared.lock().recorder.event_count()
    }

    /// Elapsed time shown next to the cursor.
    ///
    /// While recording this is the recording's elapsed time; otherwise it is
    /// the offset of the cursor event from the first event.
    pub fn elapsed_ms_at_cursor(&self) -> Option<i64> {
        let inner = self.shared.lock();
        if inner.state.is_recording() {
            return recording_elapsed(&inner);
        }
        inner.recorder.session().elapsed_ms_at(inner.cursor)
    }

    /// Time since the recording started, while recording
    pub fn recording_elapsed_ms(&self) -> Option<i64> {
        recording_elapsed(&self.shared.lock())
    }

    /// Offset of the event at `index` from the first event
    pub fn elapsed_ms_at(&self, index: usize) -> Option<i64> {
        self.shared.lock().recorder.session().elapsed_ms_at(index)
    }

    pub fn total_duration_ms(&self) -> i64 {
        self.shared.lock().recorder.session().duration_ms()
    }

    /// Copy of the active session
    pub fn session(&self) -> Session {
        self.shared.lock().recorder.session().clone()
    }

    pub fn metadata(&self) -> SessionMetadata {
        self.shared.lock().recorder.metadata().clone()
    }

    pub fn live_buffer_len(&self) -> usize {
        self.shared.lock().live.len()
    }

    // ==================== Internals ====================

    /// Return to `Idle` from `Playing`/`Paused`, notifying the sink
    fn stop_playback_locked<'a>(
        &'a self,
        mut inner: MutexGuard<'a, Inner>,
    ) -> MutexGuard<'a, Inner> {
        if !inner.state.is_replaying() {
            return inner;
        }
        inner.state = PlaybackState::Idle;
        inner = self.retire_pacer(inner);
        self.shared.sink.playback_finished();
        tracing::debug!("Playback stopped at #{}", inner.cursor);
        inner
    }

    /// Tell the current pacing loop to exit and wait briefly for it
    fn retire_pacer<'a>(&'a self, mut inner: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        inner.generation = inner.generation.wrapping_add(1);
        self.shared.wake.notify_all();

        let deadline = Instant::now() + self.join_timeout;
        while inner.active_loops > 0 {
            let now = Instant::now();
            if now >= deadline {
                tracing::debug!("Pacing thread did not exit within {:?}", self.join_timeout);
                break;
            }
            inner = self
                .shared
                .wake
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        if inner.active_loops == 0 {
            if let Some(handle) = inner.pacer.take() {
                let _ = handle.join();
            }
        } else {
            // Left detached; it exits on its next wake
            inner.pacer = None;
        }
        inner
    }

    fn spawn_pacer(&self, inner: &mut Inner) {
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        let shared = Arc::clone(&self.shared);
        let min_delay = self.min_delay;

        if let Some(old) = inner.pacer.take() {
            if old.is_finished() {
                let _ = old.join();
            }
        }

        inner.active_loops += 1;
        let spawned = std::thread::Builder::new()
            .name("playback-pacer".to_string())
            .spawn(move || run_pacer(shared, generation, min_delay));

        match spawned {
            Ok(handle) => {
                inner.pacer = Some(handle);
                tracing::debug!("Playback started at #{}", inner.cursor);
            }
            Err(e) => {
                tracing::warn!("Failed to spawn playback thread: {}", e);
                inner.active_loops -= 1;
                inner.state = PlaybackState::Idle;
            }
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let handle = {
            let mut inner = self.shared.lock();
            inner.state = match inner.state {
                PlaybackState::Playing | PlaybackState::Paused => PlaybackState::Idle,
                other => other,
            };
            inner.generation = inner.generation.wrapping_add(1);
            self.shared.wake.notify_all();
            inner.pacer.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn recording_elapsed(inner: &Inner) -> Option<i64> {
    if !inner.state.is_recording() {
        return None;
    }
    inner
        .recorder
        .elapsed()
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Body of the pacing thread
fn run_pacer(shared: Arc<Shared>, generation: u64, min_delay: Duration) {
    let mut inner = shared.lock();

    if inner.generation == generation && inner.state.is_playing() {
        let cursor = inner.cursor;
        shared.dispatch_at(&mut inner, cursor);
    }

    loop {
        if inner.generation != generation {
            break;
        }
        match inner.state {
            PlaybackState::Playing => {}
            PlaybackState::Paused => {
                inner = shared
                    .wake
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            PlaybackState::Idle | PlaybackState::Recording => break,
        }

        let timing = {
            let session = inner.recorder.session();
            session
                .get(inner.cursor)
                .zip(session.get(inner.cursor + 1))
                .map(|(current, next)| (current.timestamp, next.timestamp))
        };
        let Some((current, next)) = timing else {
            inner.state = PlaybackState::Idle;
            shared.sink.playback_finished();
            tracing::debug!("Playback finished");
            break;
        };

        let gap = u64::try_from(next.saturating_sub(current)).unwrap_or(0);
        let delay = Duration::from_millis(gap).max(min_delay);
        let deadline = Instant::now().checked_add(delay);

        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    deadline - now
                }
                // Gap too large to represent as an instant; only a stop ends it
                None => delay,
            };
            inner = shared
                .wake
                .wait_timeout(inner, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            if inner.generation != generation || !inner.state.is_playing() {
                break;
            }
        }

        if inner.generation != generation || !inner.state.is_playing() {
            // Exit or park at the top of the loop; a resume waits a full delay
            continue;
        }

        let next_index = inner.cursor + 1;
        shared.dispatch_at(&mut inner, next_index);
    }

    inner.active_loops = inner.active_loops.saturating_sub(1);
    shared.wake.notify_all();
}

/// Index of the first position event after `from`
fn next_position(session: &Session, from: usize) -> Option<usize> {
    session
        .iter()
        .enumerate()
        .skip(from + 1)
        .find(|(_, e)| e.payload.is_position())
        .map(|(i, _)| i)
}

/// Index of the last position event before `before`
fn previous_position(session: &Session, before: usize) -> Option<usize> {
    session.events()[..before.min(session.len())]
        .iter()
        .rposition(|e| e.payload.is_position())
}

/// First index to dispatch when landing on `target`: just past the previous
/// position event, or the start of the session
fn window_start(session: &Session, target: usize) -> usize {
    previous_position(session, target).map_or(0, |i| i + 1)
}

/// Position event nearest to `index`; the earlier one wins a tie
fn closest_position(session: &Session, index: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, event) in session.iter().enumerate() {
        if !event.payload.is_position() {
            continue;
        }
        let distance = i.abs_diff(index);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}
