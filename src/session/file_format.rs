//! Line-oriented recording files
//!
//! Each line holds one event as `<timestamp_ms>|<payload>`, where the payload
//! uses the same prefixed encoding as the UDP protocol. Lines that do not
//! decode are skipped with a warning so a partially damaged file still loads.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{ParseError, Result, ResultExt};
use crate::protocol::{format_payload, parse_payload};
use crate::types::TelemetryEvent;

use super::types::{RecordedEvent, Session};

/// Encode one event as a file line, without the trailing newline.
///
/// Newlines inside text or values are replaced with spaces so every event
/// stays on a single line.
pub fn format_line(event: &RecordedEvent) -> String {
    let payload = format_payload(&event.payload);
    let payload = if payload.contains(['\n', '\r']) {
        payload.replace(['\n', '\r'], " ")
    } else {
        payload
    };
    format!("{}|{}", event.timestamp, payload)
}

/// Decode one file line
pub fn parse_line(line: &str) -> std::result::Result<RecordedEvent, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let (timestamp, payload) = line.split_once('|').ok_or(ParseError::MissingSeparator)?;
    let timestamp = timestamp
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidTimestamp(timestamp.to_string()))?;
    Ok(RecordedEvent::new(timestamp, parse_payload(payload)?))
}

/// Summary of a load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Write a whole session to `path`, replacing any existing file
pub fn save_session(path: impl AsRef<Path>, session: &Session) -> Result<()> {
    let path = path.as_ref();
    let mut writer = SessionWriter::create(path)?;
    for event in session.iter() {
        writer.write_event(event)?;
    }
    writer.finish()?;
    tracing::info!("Saved {} events to {:?}", session.len(), path);
    Ok(())
}

/// Read a session from `path`.
///
/// Fails only on IO errors; undecodable lines are skipped.
pub fn load_session(path: impl AsRef<Path>) -> Result<Session> {
    load_session_with_report(path).map(|(session, _)| session)
}

/// Like [`load_session`], also reporting how many lines were skipped
pub fn load_session_with_report(path: impl AsRef<Path>) -> Result<(Session, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open recording {:?}", path))?;
    let reader = BufReader::new(file);

    let mut session = Session::new();
    let mut report = LoadReport::default();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read recording {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(event) => {
                session.push(event);
                report.loaded += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping line {} of {:?}: {}", line_no + 1, path, e);
                report.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Loaded {} events from {:?} ({} skipped)",
        report.loaded,
        path,
        report.skipped
    );
    Ok((session, report))
}

/// Streams events to a recording file as they arrive
#[derive(Debug)]
pub struct SessionWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl SessionWriter {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let file =
            File::create(&path).with_context(|| format!("Failed to create recording {:?}", path))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write_event(&mut self, event: &RecordedEvent) -> Result<()> {
        writeln!(self.writer, "{}", format_line(event))
            .with_context(|| format!("Failed to write recording {:?}", self.path))?;
        self.written += 1;
        Ok(())
    }

    /// Convenience for streaming raw ingested events
    pub fn write(&mut self, timestamp: i64, payload: &TelemetryEvent) -> Result<()> {
        self.write_event(&RecordedEvent::new(timestamp, payload.clone()))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush recording {:?}", self.path))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the number of events written
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let event = RecordedEvent::new(1_700_000_000_123, TelemetryEvent::position(1.0, 2.5, 90.0));
        assert_eq!(format_line(&event), "1700000000123|pos:1.000,2.500,90.000");
    }

    #[test]
    fn test_format_line_flattens_newlines() {
        let event = RecordedEvent::new(5, TelemetryEvent::text("two\nlines"));
        assert_eq!(format_line(&event), "5|txt:two lines");
    }

    #[test]
    fn test_parse_line() {
        let event = parse_line("42|kv:mode,AUTO").unwrap();
        assert_eq!(event.timestamp, 42);
        assert_eq!(event.payload, TelemetryEvent::key_value("mode", "AUTO"));

        // Payload may itself contain '|'
        let event = parse_line("7|txt:a|b").unwrap();
        assert_eq!(event.payload, TelemetryEvent::text("a|b"));
    }

    #[test]
    fn test_parse_line_errors() {
        assert_eq!(parse_line("pos:1,2,3"), Err(ParseError::MissingSeparator));
        assert!(matches!(
            parse_line("abc|pos:1,2,3"),
            Err(ParseError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            parse_line("1|bogus:1"),
            Err(ParseError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_load_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.rec");
        std::fs::write(
            &path,
            "100|pos:1,2,3\n\
             garbage\n\
             \n\
             150|kv:battery,12.1\n\
             x|txt:nope\n\
             200|pos:4,5,6\n",
        )
        .unwrap();

        let (session, report) = load_session_with_report(&path).unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(report, LoadReport { loaded: 3, skipped: 2 });
        assert_eq!(session.elapsed_ms_at(2), Some(100));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_session(dir.path().join("nope.rec")).unwrap_err();
        assert!(err.to_string().contains("Failed to open recording"));
    }

    #[test]
    fn test_writer_streams_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("live.rec");

        let mut writer = SessionWriter::create(&path).unwrap();
        writer.write(10, &TelemetryEvent::position(0.0, 0.0, 0.0)).unwrap();
        writer.write(20, &TelemetryEvent::circle(3.0, 0.0)).unwrap();
        assert_eq!(writer.written(), 2);
        assert_eq!(writer.finish().unwrap(), 2);

        let session = load_session(&path).unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.first_timestamp(), Some(10));
    }
}
