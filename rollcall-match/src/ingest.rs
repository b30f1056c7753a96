//! CSV ingestion for roster and attendance exports
//!
//! Headers are matched case-insensitively against known aliases (the
//! Indonesian labels used by the mentoring program and the call export, plus
//! English fallbacks). Every error names the origin, the line and the column.

use crate::models::{AttendeeRecord, MenteeRecord};
use crate::sources::{AttendeeSource, RosterSource};
use async_trait::async_trait;
use rollcall_common::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const NAME_ALIASES: &[&str] = &["nama", "name"];
const PROGRAM_ALIASES: &[&str] = &["program"];
const MENTOR_ALIASES: &[&str] = &["mentor"];
const ATTENDEE_NAME_ALIASES: &[&str] = &["nama (nama asli)", "nama", "name"];
const EMAIL_ALIASES: &[&str] = &["email"];
const DURATION_ALIASES: &[&str] = &[
    "total durasi (menit)",
    "total durasi (menit)s",
    "durasi",
    "duration",
];
const GUEST_ALIASES: &[&str] = &["tamu", "guest"];

/// Resolved column positions for one file
struct Columns {
    headers: Vec<String>,
    origin: String,
}

impl Columns {
    fn new(headers: &csv::StringRecord, origin: &str) -> Self {
        Self {
            headers: headers.iter().map(|h| h.trim().to_lowercase()).collect(),
            origin: origin.to_string(),
        }
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    fn require(&self, aliases: &[&str]) -> Result<usize> {
        self.find(aliases).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{}: missing required column (expected one of: {})",
                self.origin,
                aliases.join(", ")
            ))
        })
    }
}

fn read_headers<R: Read>(reader: &mut csv::Reader<R>, origin: &str) -> Result<Columns> {
    let headers = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("{}: unreadable header row: {}", origin, e)))?;
    Ok(Columns::new(headers, origin))
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn line_of(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn record_error(origin: &str, e: csv::Error) -> Error {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    Error::InvalidInput(format!("{} line {}: {}", origin, line, e))
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn optional_field(record: &csv::StringRecord, column: Option<usize>) -> String {
    column
        .and_then(|c| record.get(c))
        .unwrap_or_default()
        .to_string()
}

fn required_field(
    record: &csv::StringRecord,
    column: usize,
    field: &str,
    origin: &str,
) -> Result<String> {
    let value = record.get(column).unwrap_or_default();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} line {}: empty '{}'",
            origin,
            line_of(record),
            field
        )));
    }
    Ok(value.to_string())
}

/// Parse roster CSV (`Nama`, `Program`, `Mentor`)
pub fn parse_roster<R: Read>(input: R, origin: &str) -> Result<Vec<MenteeRecord>> {
    let mut reader = csv_reader(input);
    let columns = read_headers(&mut reader, origin)?;
    let name_col = columns.require(NAME_ALIASES)?;
    let program_col = columns.find(PROGRAM_ALIASES);
    let mentor_col = columns.find(MENTOR_ALIASES);

    let mut roster = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| record_error(origin, e))?;
        if is_blank(&record) {
            continue;
        }
        roster.push(MenteeRecord {
            name: required_field(&record, name_col, "name", origin)?,
            program: optional_field(&record, program_col),
            mentor: optional_field(&record, mentor_col),
        });
    }

    debug!(origin = %origin, count = roster.len(), "Parsed roster");
    Ok(roster)
}

/// Parse call-attendance CSV (`Nama (nama asli)`, `Email`, `Total durasi (menit)`, `Tamu`)
pub fn parse_attendees<R: Read>(input: R, origin: &str) -> Result<Vec<AttendeeRecord>> {
    let mut reader = csv_reader(input);
    let columns = read_headers(&mut reader, origin)?;
    let name_col = columns.require(ATTENDEE_NAME_ALIASES)?;
    let duration_col = columns.require(DURATION_ALIASES)?;
    let email_col = columns.find(EMAIL_ALIASES);
    let guest_col = columns.find(GUEST_ALIASES);

    let mut attendees = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| record_error(origin, e))?;
        if is_blank(&record) {
            continue;
        }

        let name = required_field(&record, name_col, "name", origin)?;
        let raw_duration = required_field(&record, duration_col, "duration", origin)?;
        let duration_minutes = raw_duration.parse::<u32>().map_err(|_| {
            Error::InvalidInput(format!(
                "{} line {}: 'duration' must be a non-negative whole number of minutes, got {:?}",
                origin,
                line_of(&record),
                raw_duration
            ))
        })?;

        attendees.push(AttendeeRecord {
            name,
            email: optional_field(&record, email_col),
            duration_minutes,
            guest_flag: optional_field(&record, guest_col),
        });
    }

    debug!(origin = %origin, count = attendees.len(), "Parsed attendees");
    Ok(attendees)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })
}

/// Roster read from a CSV file
pub struct CsvRosterSource {
    path: PathBuf,
}

impl CsvRosterSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RosterSource for CsvRosterSource {
    async fn load(&self) -> Result<Vec<MenteeRecord>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            parse_roster(open(&path)?, &path.display().to_string())
        })
        .await
        .map_err(|e| Error::Internal(format!("Roster load task failed: {}", e)))?
    }
}

/// Attendance read from a CSV file
pub struct CsvAttendeeSource {
    path: PathBuf,
}

impl CsvAttendeeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AttendeeSource for CsvAttendeeSource {
    async fn load(&self) -> Result<Vec<AttendeeRecord>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            parse_attendees(open(&path)?, &path.display().to_string())
        })
        .await
        .map_err(|e| Error::Internal(format!("Attendance load task failed: {}", e)))?
    }
}
