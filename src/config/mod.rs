//! Configuration module for fieldreplay-rs
//!
//! This module handles:
//! - Runtime configuration ([`AppConfig`]) read from a TOML file
//! - Application state persistence (recently saved/opened recordings)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.fieldreplay.fieldreplay-rs/`
//! - **macOS**: `~/Library/Application Support/dev.fieldreplay.fieldreplay-rs/`
//! - **Windows**: `%APPDATA%\dev.fieldreplay.fieldreplay-rs\`
//!
//! # Files
//!
//! - `app_state.json` - Recent recordings list
//! - `fieldreplay.toml` - Optional runtime configuration, also loadable from any path
//!
//! # Example
//!
//! ```ignore
//! use fieldreplay_rs::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default("fieldreplay.toml");
//! let mut state = AppState::load_or_default();
//! state.add_recent_recording("match-3.rec", 1_234);
//! state.save()?;
//! ```

use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.fieldreplay.fieldreplay-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Config filename looked up in the app data directory
pub const CONFIG_FILE: &str = "fieldreplay.toml";

/// Recording file extension
pub const RECORDING_FILE_EXTENSION: &str = "rec";

/// Maximum number of recent recordings to remember
pub const MAX_RECENT_RECORDINGS: usize = 10;

/// Default UDP port for position telemetry
pub const DEFAULT_PORT: u16 = 7777;

/// Default maximum datagram size in bytes
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024;

/// Default live buffer retention (10 minutes)
pub const DEFAULT_RETENTION_SECS: u64 = 600;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        ReplayError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            ReplayError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Runtime Configuration ====================

/// Complete runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// UDP listener settings
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Live ring buffer settings
    #[serde(default)]
    pub buffer: BufferConfig,

    /// Playback pacing settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Where recordings are written
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplayError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ReplayError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a config file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReplayError::Serialization(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| {
            ReplayError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}

/// UDP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind on
    pub bind_address: String,

    /// UDP port
    pub port: u16,

    /// Largest datagram accepted; longer ones are truncated by the socket
    pub max_packet_size: usize,

    /// How often the receive loop checks for shutdown
    pub poll_interval_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            poll_interval_ms: 100,
        }
    }
}

impl ListenerConfig {
    /// Resolve the bind address and port into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                ReplayError::Config(format!(
                    "Invalid bind address '{}:{}': {}",
                    self.bind_address, self.port, e
                ))
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Live ring buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    /// How long events stay in the live buffer
    pub retention_secs: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}

impl BufferConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Playback pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Floor for the delay between consecutive events
    pub min_delay_ms: u64,

    /// How long stopping waits for the pacing thread to exit
    pub join_timeout_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1,
            join_timeout_ms: 100,
        }
    }
}

impl PlaybackConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms.max(1))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// Recording output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory for new recordings (current directory when unset)
    pub directory: Option<PathBuf>,

    /// File extension for recordings
    pub extension: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            extension: RECORDING_FILE_EXTENSION.to_string(),
        }
    }
}

impl RecordingConfig {
    /// Path for a new recording named after the current local time
    pub fn timestamped_path(&self) -> PathBuf {
        let name = format!(
            "recording-{}.{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            self.extension
        );
        match &self.directory {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write daily rolling log files here
    pub file_dir: Option<PathBuf>,
}

// ==================== Recent Recording Entry ====================

/// Information about a recently saved or opened recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentRecording {
    /// Path to the recording file
    pub path: PathBuf,

    /// Number of events in the recording
    pub event_count: usize,

    /// Last used timestamp (Unix seconds)
    pub last_opened: u64,
}

impl RecentRecording {
    pub fn new(path: impl Into<PathBuf>, event_count: usize) -> Self {
        Self {
            path: path.into(),
            event_count,
            last_opened: unix_now_secs(),
        }
    }

    /// Check if the recording file still exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ==================== App State ====================

/// Persistent application state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Recently saved or opened recordings, most recent first
    #[serde(default)]
    pub recent_recordings: Vec<RecentRecording>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            recent_recordings: Vec::new(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            ReplayError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| ReplayError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(APP_STATE_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ReplayError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReplayError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Add or refresh a recent recording
    pub fn add_recent_recording(&mut self, path: impl AsRef<Path>, event_count: usize) {
        let path = path.as_ref().to_path_buf();

        self.recent_recordings.retain(|r| r.path != path);
        self.recent_recordings
            .insert(0, RecentRecording::new(path, event_count));
        self.recent_recordings.truncate(MAX_RECENT_RECORDINGS);
    }

    /// Remove a recording from recents
    pub fn remove_recent_recording(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.recent_recordings.retain(|r| r.path != path);
    }

    /// Clean up recent recordings that no longer exist
    pub fn cleanup_missing_recordings(&mut self) {
        self.recent_recordings.retain(|r| r.exists());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listener.port, 7777);
        assert_eq!(config.listener.max_packet_size, 1024);
        assert_eq!(config.buffer.retention(), Duration::from_secs(600));
        assert_eq!(config.playback.min_delay(), Duration::from_millis(1));
        assert_eq!(config.playback.join_timeout(), Duration::from_millis(100));
        assert_eq!(config.recording.extension, "rec");
        assert!(config.logging.file_dir.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            port = 9000

            [buffer]
            retention_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.listener.bind_address, "0.0.0.0");
        assert_eq!(config.buffer.retention_secs, 30);
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::default();
        config.listener.port = 1234;
        config.recording.directory = Some(PathBuf::from("/tmp/recs"));
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "listener = 12").unwrap();
        assert!(AppConfig::load(&path).is_err());
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
        assert_eq!(
            AppConfig::load_or_default(dir.path().join("missing.toml")),
            AppConfig::default()
        );
    }

    #[test]
    fn test_socket_addr() {
        let listener = ListenerConfig::default();
        assert_eq!(listener.socket_addr().unwrap().port(), 7777);

        let bad = ListenerConfig {
            bind_address: "not an address".to_string(),
            ..Default::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_timestamped_path() {
        let config = RecordingConfig {
            directory: Some(PathBuf::from("out")),
            extension: "rec".to_string(),
        };
        let path = config.timestamped_path();
        assert!(path.starts_with("out"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("rec"));
    }

    #[test]
    fn test_add_recent_recording() {
        let mut state = AppState::default();
        state.add_recent_recording("/a.rec", 10);
        state.add_recent_recording("/b.rec", 20);
        state.add_recent_recording("/a.rec", 11);

        assert_eq!(state.recent_recordings.len(), 2);
        assert_eq!(state.recent_recordings[0].path, PathBuf::from("/a.rec"));
        assert_eq!(state.recent_recordings[0].event_count, 11);

        state.remove_recent_recording("/b.rec");
        assert_eq!(state.recent_recordings.len(), 1);
    }

    #[test]
    fn test_recent_recordings_max_limit() {
        let mut state = AppState::default();
        for i in 0..15 {
            state.add_recent_recording(format!("/r{}.rec", i), i);
        }
        assert_eq!(state.recent_recordings.len(), MAX_RECENT_RECORDINGS);
        assert_eq!(state.recent_recordings[0].path, PathBuf::from("/r14.rec"));
    }

    #[test]
    fn test_app_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);

        assert!(AppState::load_from(&path).unwrap().recent_recordings.is_empty());

        let mut state = AppState::default();
        state.add_recent_recording(dir.path().join("x.rec"), 3);
        state.save_to(&path).unwrap();

        let mut loaded = AppState::load_from(&path).unwrap();
        assert_eq!(loaded.recent_recordings.len(), 1);
        loaded.cleanup_missing_recordings();
        assert!(loaded.recent_recordings.is_empty());
    }
}
