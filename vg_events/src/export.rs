//! ABOUTME: CSV export and import of motion events
//! ABOUTME: Columns are Started, Stopped and Duration (seconds) with RFC3339 timestamps

use crate::MotionEvent;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{info, warn};
use vg_core::{to_rfc3339, Error, Result};

pub const HEADER: [&str; 3] = ["Started", "Stopped", "Duration (seconds)"];

#[derive(Debug, Serialize, Deserialize)]
struct EventRow {
    #[serde(rename = "Started")]
    started: String,
    #[serde(rename = "Stopped")]
    stopped: String,
    #[serde(rename = "Duration (seconds)")]
    duration: f64,
}

impl From<&MotionEvent> for EventRow {
    fn from(event: &MotionEvent) -> Self {
        Self {
            started: to_rfc3339(event.start),
            stopped: to_rfc3339(event.end),
            duration: event.duration,
        }
    }
}

impl TryFrom<EventRow> for MotionEvent {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(MotionEvent {
            start: parse_timestamp(&row.started)?,
            end: parse_timestamp(&row.stopped)?,
            duration: row.duration,
        })
    }
}

/// Accepts RFC3339 and the plain `YYYY-MM-DD HH:MM:SS[.ffffff]` local form
fn parse_timestamp(text: &str) -> Result<DateTime<Local>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| Error::Export(format!("Invalid timestamp '{}': {}", text, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::Export(format!("Timestamp '{}' does not exist locally", text)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Export(e.to_string())
}

/// Write the header and one row per event
pub fn to_writer<W: io::Write>(events: &[MotionEvent], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(HEADER).map_err(csv_error)?;
    for event in events {
        csv_writer.serialize(EventRow::from(event)).map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Export to a file; an empty log leaves the file untouched and returns false
pub fn export_to_path(events: &[MotionEvent], path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if events.is_empty() {
        warn!(path = %path.display(), "No motion events to export");
        return Ok(false);
    }

    let file = File::create(path)?;
    to_writer(events, file)?;
    info!(path = %path.display(), events = events.len(), "Exported motion events");
    Ok(true)
}

/// Read events back from CSV
pub fn read_events<R: io::Read>(reader: R) -> Result<Vec<MotionEvent>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    csv_reader
        .deserialize::<EventRow>()
        .map(|row| row.map_err(csv_error).and_then(MotionEvent::try_from))
        .collect()
}

pub fn import_from_path(path: impl AsRef<Path>) -> Result<Vec<MotionEvent>> {
    let file = File::open(path.as_ref())?;
    read_events(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_support::monday_at;

    fn sample_events() -> Vec<MotionEvent> {
        let t0 = monday_at(14, 0, 0) + Duration::microseconds(250_125);
        vec![
            MotionEvent::new(t0, t0 + Duration::milliseconds(3500)),
            MotionEvent::new(t0 + Duration::minutes(5), t0 + Duration::minutes(6)),
        ]
    }

    #[test]
    fn test_header_and_rows() {
        let mut buffer = Vec::new();
        to_writer(&sample_events(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("Started,Stopped,Duration (seconds)"));
        let first = lines.next().unwrap();
        assert!(first.ends_with(",3.5"), "row {}", first);
        assert!(first.starts_with("2024-01-15T14:00:00.250125"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_empty_writer_gets_header_only() {
        let mut buffer = Vec::new();
        to_writer(&[], &mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Started,Stopped,Duration (seconds)\n"
        );
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let events = sample_events();

        assert!(export_to_path(&events, &path).unwrap());
        let back = import_from_path(&path).unwrap();
        assert_eq!(back, events);
    }

    #[test]
    fn test_reads_plain_local_timestamps() {
        let csv = "Started,Stopped,Duration (seconds)\n\
                   2024-01-15 14:00:00.500000,2024-01-15 14:00:02,1.5\n";
        let events = read_events(csv.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, monday_at(14, 0, 0) + Duration::milliseconds(500));
        assert_eq!(events[0].duration, 1.5);
    }

    #[test]
    fn test_bad_timestamp_is_export_error() {
        let csv = "Started,Stopped,Duration (seconds)\nyesterday,today,1.0\n";
        assert!(matches!(read_events(csv.as_bytes()), Err(Error::Export(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = import_from_path("/nonexistent/events.csv");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
