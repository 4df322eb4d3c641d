//! Error handling for fieldreplay-rs
//!
//! This module defines the crate-wide error type and a Result alias. Malformed
//! telemetry input has its own [`ParseError`] because it is logged and skipped
//! rather than returned to callers.

use thiserror::Error;

/// Main error type for fieldreplay-rs operations
#[derive(Error, Debug)]
pub enum ReplayError {
    /// IO errors (recording files, sockets)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// A telemetry message or recording line could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The UDP listener could not be started
    #[error("Listener error: {0}")]
    Listener(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReplayError>,
    },
}

impl ReplayError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReplayError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Reasons a prefixed telemetry payload fails to decode
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty message")]
    Empty,

    #[error("unknown message prefix in '{0}'")]
    UnknownPrefix(String),

    #[error("'{prefix}' expects {expected} fields, got {found}")]
    FieldCount {
        prefix: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid number '{value}' for field '{field}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("missing '|' separator between timestamp and payload")]
    MissingSeparator,

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Result type alias for fieldreplay-rs operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReplayError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReplayError::Io(e).with_context(f()))
    }
}
