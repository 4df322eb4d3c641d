//! Benchmarks for the ingest and replay hot paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use fieldreplay_rs::dispatch::{DispatchOrigin, EventSink};
use fieldreplay_rs::protocol::{format_payload, parse_payload};
use fieldreplay_rs::session::file_format::{format_line, parse_line};
use fieldreplay_rs::session::LiveRingBuffer;
use fieldreplay_rs::{PlaybackController, RecordedEvent, Session, TelemetryEvent};

/// Sink that discards everything
struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&self, payload: &TelemetryEvent, _origin: DispatchOrigin) {
        black_box(payload);
    }

    fn progress(&self, index: usize) {
        black_box(index);
    }

    fn playback_finished(&self) {}
}

fn sample_messages() -> Vec<&'static str> {
    vec![
        "pos:72.125,-12.500,180.000",
        "cir:6.000,45.000",
        "line:lookahead,1.000,2.000,3.000,4.000,1",
        "txt:Intake running, waiting for ring",
        "kv:pid,1.0,0.2,0.01",
    ]
}

fn bench_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("protocol");
    let messages = sample_messages();

    group.throughput(Throughput::Elements(messages.len() as u64));
    group.bench_function("parse_payload", |b| {
        b.iter(|| {
            for msg in &messages {
                let _ = black_box(parse_payload(black_box(msg)));
            }
        });
    });

    let events: Vec<TelemetryEvent> = messages
        .iter()
        .filter_map(|m| parse_payload(m).ok())
        .collect();
    group.bench_function("format_payload", |b| {
        b.iter(|| {
            for event in &events {
                black_box(format_payload(event));
            }
        });
    });

    let line = format_line(&RecordedEvent::new(1_700_000_000_000, events[0].clone()));
    group.bench_function("parse_line", |b| {
        b.iter(|| black_box(parse_line(black_box(&line))));
    });

    group.finish();
}

fn bench_live_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("live_buffer");

    // 50 Hz for the full window keeps the buffer at steady state
    let retention = Duration::from_secs(600);
    let mut buffer = LiveRingBuffer::new(retention);
    let mut ts = 0i64;
    while ts <= 600_000 {
        buffer.push(ts, TelemetryEvent::position(0.0, 0.0, 0.0));
        ts += 20;
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("push_at_steady_state", |b| {
        b.iter(|| {
            buffer.push(ts, TelemetryEvent::position(1.0, 2.0, 3.0));
            ts += 20;
        });
    });

    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(buffer.snapshot()));
    });

    group.finish();
}

fn bench_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek");

    for size in [1_000usize, 10_000, 50_000].iter() {
        let session: Session = (0..*size)
            .map(|i| {
                let payload = if i % 4 == 0 {
                    TelemetryEvent::position(i as f64, 0.0, 0.0)
                } else {
                    TelemetryEvent::key_value("i", i.to_string())
                };
                RecordedEvent::new(i as i64 * 20, payload)
            })
            .collect();

        let controller = PlaybackController::new(Arc::new(NullSink));
        controller.load_session(session);

        group.bench_with_input(BenchmarkId::new("seek_to", size), size, |b, &size| {
            let mut target = 0usize;
            b.iter(|| {
                controller.seek_to(black_box(target));
                target = (target + 7_919) % size;
            });
        });
    }

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    let controller = PlaybackController::new(Arc::new(NullSink));
    controller.start_recording();

    group.throughput(Throughput::Elements(1));
    group.bench_function("ingest_while_recording", |b| {
        let mut ts = 0i64;
        b.iter(|| {
            controller.ingest_at(ts, TelemetryEvent::position(1.0, 2.0, 3.0));
            ts += 1;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_protocol,
    bench_live_buffer,
    bench_seek,
    bench_ingest
);

criterion_main!(benches);
