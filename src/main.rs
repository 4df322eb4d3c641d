//! fieldreplay - command line front end
//!
//! Listens for robot telemetry, records it, and replays or inspects
//! recording files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fieldreplay_rs::{
    config::{self, AppConfig, AppState, LoggingConfig},
    dispatch::{presentation_channel, DispatchOrigin, FieldState, Presentation},
    ingest::{SimulatedRobot, TelemetrySender, UdpListener},
    protocol::format_payload,
    session::{file_format, PlaybackController},
    PresentationMessage,
};

const UI_TICK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file (defaults to fieldreplay.toml in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Receive live telemetry and print it
    Listen {
        #[arg(short, long)]
        port: Option<u16>,

        /// Record everything received and save it on exit. Without a path
        /// a timestamped file in the configured recording directory is used.
        #[arg(short, long, num_args = 0..=1)]
        record: Option<Option<PathBuf>>,
    },
    /// Play a recording back at its original timing
    Replay {
        file: PathBuf,

        /// Start from the position event closest to this index
        #[arg(long)]
        from: Option<usize>,
    },
    /// Summarize a recording
    Inspect { file: PathBuf },
    /// Send a synthetic robot path to a listener
    Simulate {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
        port: u16,

        #[arg(short, long, default_value_t = 30)]
        duration_secs: u64,
    },
}

fn load_config(path: Option<&Path>) -> AppConfig {
    match path {
        Some(path) => AppConfig::load_or_default(path),
        None => config::default_config_path()
            .map(AppConfig::load_or_default)
            .unwrap_or_default(),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fieldreplay_rs=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    match &logging.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fieldreplay.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

fn install_ctrlc() -> anyhow::Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("Could not set Ctrl-C handler")?;
    Ok(running)
}

fn remember_recording(path: &Path, event_count: usize) {
    let mut state = AppState::load_or_default();
    state.add_recent_recording(path, event_count);
    if let Err(e) = state.save() {
        tracing::warn!("Failed to save app state: {}", e);
    }
}

fn listen(config: &AppConfig, record: Option<Option<PathBuf>>) -> anyhow::Result<()> {
    let running = install_ctrlc()?;
    let (sink, receiver) = presentation_channel();
    let controller = Arc::new(PlaybackController::with_config(
        Arc::new(sink),
        &config.playback,
        &config.buffer,
    ));

    let record_path =
        record.map(|path| path.unwrap_or_else(|| config.recording.timestamped_path()));

    let ingest = controller.clone();
    let mut listener = UdpListener::bind(&config.listener, move |event| ingest.ingest(event))
        .context("Could not start UDP listener")?;
    println!("Listening on {} (Ctrl-C to stop)", listener.local_addr());

    if let Some(path) = &record_path {
        controller.start_recording();
        println!("Recording to {}", path.display());
    }

    while running.load(Ordering::SeqCst) {
        let Some(msg) = receiver.recv_timeout(UI_TICK) else {
            continue;
        };
        if let PresentationMessage::Event { payload, .. } = msg {
            println!("{}", format_payload(&payload));
        }
    }

    listener.shutdown();
    let stats = listener.stats();
    tracing::info!(
        "Received {} datagrams, dropped {}",
        stats.received(),
        stats.dropped()
    );

    if let Some(path) = record_path {
        controller.stop_recording();
        let written = controller
            .save_file(&path)
            .with_context(|| format!("Could not save {}", path.display()))?;
        println!("Wrote {} events to {}", written, path.display());
        remember_recording(&path, written);
    }
    Ok(())
}

/// Prints replayed events and tracks the field model
struct ReplayPrinter {
    field: FieldState,
    total: usize,
}

impl Presentation for ReplayPrinter {
    fn on_event(&mut self, payload: fieldreplay_rs::TelemetryEvent, origin: DispatchOrigin) {
        if origin == DispatchOrigin::Playback {
            print!("{}", format_payload(&payload));
        }
        self.field.on_event(payload, origin);
    }

    fn on_progress(&mut self, index: usize) {
        println!("  [{}/{}]", index + 1, self.total);
        self.field.on_progress(index);
    }

    fn on_playback_finished(&mut self) {
        self.field.on_playback_finished();
    }
}

fn replay(config: &AppConfig, file: &Path, from: Option<usize>) -> anyhow::Result<()> {
    let running = install_ctrlc()?;
    let (sink, receiver) = presentation_channel();
    let controller =
        PlaybackController::with_config(Arc::new(sink), &config.playback, &config.buffer);

    let count = controller
        .load_file(file)
        .with_context(|| format!("Could not load {}", file.display()))?;
    if count == 0 {
        println!("{} contains no events", file.display());
        return Ok(());
    }
    remember_recording(file, count);

    let mut printer = ReplayPrinter {
        field: FieldState::new(),
        total: count,
    };
    if let Some(index) = from {
        controller.seek_to(index);
        // Seek dispatches the frame leading up to the start point
        receiver.pump(&mut printer);
    }

    let started = Instant::now();
    controller.play();
    while printer.field.finished_count == 0 {
        if !running.load(Ordering::SeqCst) {
            controller.stop();
        }
        if let Some(msg) = receiver.recv_timeout(UI_TICK) {
            printer.apply(msg);
        }
    }

    println!(
        "Replayed to event {} in {:.1}s ({} lines, {} key/values)",
        printer.field.progress.map_or(0, |i| i + 1),
        started.elapsed().as_secs_f64(),
        printer.field.lines.len(),
        printer.field.table.len()
    );
    Ok(())
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let (session, report) = file_format::load_session_with_report(file)
        .with_context(|| format!("Could not load {}", file.display()))?;

    println!("File:      {}", file.display());
    println!("Events:    {} ({} lines skipped)", session.len(), report.skipped);
    if let Some(first) = session.first_timestamp() {
        if let Some(start) = chrono::DateTime::from_timestamp_millis(first) {
            println!("Started:   {}", start.with_timezone(&chrono::Local));
        }
    }
    println!(
        "Duration:  {:.3}s",
        session.duration_ms() as f64 / 1000.0
    );
    for (kind, count) in session.kind_counts() {
        println!("  {:<10} {}", kind.to_string(), count);
    }
    Ok(())
}

fn simulate(host: &str, port: u16, duration_secs: u64) -> anyhow::Result<()> {
    let running = install_ctrlc()?;
    let sender = TelemetrySender::connect(host, port)
        .with_context(|| format!("Could not reach {}:{}", host, port))?;
    println!("Sending to {} for {}s", sender.target(), duration_secs);

    let mut robot = SimulatedRobot::default();
    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    while running.load(Ordering::SeqCst) && Instant::now() < deadline {
        for event in robot.tick() {
            if let Err(e) = sender.send(&event) {
                tracing::warn!("Send failed: {}", e);
            }
        }
        std::thread::sleep(UI_TICK);
    }

    println!("Sent {} ticks", robot.ticks());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Args::parse();
    let mut config = load_config(cli.config.as_deref());
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting fieldreplay");

    match cli.command {
        Commands::Listen { port, record } => {
            if let Some(port) = port {
                config.listener.port = port;
            }
            listen(&config, record)
        }
        Commands::Replay { file, from } => replay(&config, &file, from),
        Commands::Inspect { file } => inspect(&file),
        Commands::Simulate {
            host,
            port,
            duration_secs,
        } => simulate(&host, port, duration_secs),
    }
}
