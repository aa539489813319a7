//! Append-only CSV journal of user interactions.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use teloxide::types::UserId;

const DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// What the user asked the bot to do.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Help,
    Joke,
    Answer,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Help => "Help",
            Self::Joke => "Joke",
            Self::Answer => "Answer",
        }
    }
}

/// One journal row summarizing a single user-bot exchange.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub id: u64,
    pub datetime: String,
    pub action: Action,
    pub request_length: u64,
    pub response_length: u64,
    pub processing_time: f64,
}

impl InteractionRecord {
    /// Column order of the on-disk journal and of the exported spreadsheet.
    pub const COLUMNS: [&'static str; 6] = [
        "id",
        "datetime",
        "action",
        "request_length",
        "response_length",
        "processing_time",
    ];

    /// `started_at` is the wall-clock time of event receipt, `elapsed` the
    /// duration from receipt to reply dispatch.
    pub fn new(
        user: UserId,
        started_at: DateTime<Local>,
        action: Action,
        request_length: u64,
        response_length: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: user.0,
            datetime: started_at.format(DATETIME_FORMAT).to_string(),
            action,
            request_length,
            response_length,
            processing_time: elapsed.as_secs_f64(),
        }
    }
}

/// Append-only store behind the journal file.  All writes go through one
/// mutex so concurrent handlers cannot interleave rows.
pub struct Journal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Append one record.  Journal failures must never abort message
    /// handling, so errors are reduced to a warning here.
    pub fn append(&self, record: &InteractionRecord) {
        if let Err(e) = self.write(record) {
            log::warn!(
                "failed to append to journal {}: {e:#}",
                self.path.display()
            );
        }
    }

    fn write(&self, record: &InteractionRecord) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        // The header goes in together with the first row and never again.
        let new_file =
            fs::metadata(&self.path).map_or(true, |meta| meta.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(
        action: Action,
        request_length: u64,
        response_length: u64,
    ) -> InteractionRecord {
        InteractionRecord {
            id: 42,
            datetime: "01.08.2026 12:00:00".to_string(),
            action,
            request_length,
            response_length,
            processing_time: 0.01,
        }
    }

    #[test]
    fn header_is_written_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let journal = Journal::new(&path);

        journal.append(&record(Action::Start, 0, 87));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], InteractionRecord::COLUMNS.join(","));

        journal.append(&record(Action::Answer, 12, 30));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], InteractionRecord::COLUMNS.join(","));
        assert!(lines[1].starts_with("42,01.08.2026 12:00:00,Start,0,87"));
        assert!(lines[2].starts_with("42,01.08.2026 12:00:00,Answer,12,30"));
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("data.csv");
        Journal::new(&path).append(&record(Action::Help, 0, 10));
        assert!(path.exists());
    }

    #[test]
    fn record_carries_start_time_and_elapsed_seconds() {
        let started_at = Local.with_ymd_and_hms(2026, 8, 1, 9, 5, 7).unwrap();
        let record = InteractionRecord::new(
            UserId(7),
            started_at,
            Action::Joke,
            17,
            40,
            Duration::from_millis(250),
        );
        assert_eq!(record.datetime, "01.08.2026 09:05:07");
        assert!((record.processing_time - 0.25).abs() < 1e-9);
    }
}
