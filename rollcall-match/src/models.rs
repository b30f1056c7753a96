//! Data models for a reconciliation run
//!
//! All records are immutable once built. Wire names are camelCase so the JSON
//! report matches what downstream consumers already read.

use serde::{Deserialize, Serialize};

/// Enrolled participant. Identity is the position in the roster; names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenteeRecord {
    pub name: String,
    pub program: String,
    pub mentor: String,
}

impl MenteeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: String::new(),
            mentor: String::new(),
        }
    }
}

/// Session-call log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRecord {
    pub name: String,
    pub email: String,
    pub duration_minutes: u32,
    pub guest_flag: String,
}

impl AttendeeRecord {
    pub fn new(name: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            name: name.into(),
            email: String::new(),
            duration_minutes,
            guest_flag: String::new(),
        }
    }
}

/// Provenance of a match decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Semantic,
    Ai,
    Rule,
    None,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Semantic => "semantic",
            MatchSource::Ai => "ai",
            MatchSource::Rule => "rule",
            MatchSource::None => "none",
        }
    }
}

/// Provenance and strength of one decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMeta {
    pub source: MatchSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl MatchMeta {
    /// No attendee assigned
    pub fn none() -> Self {
        Self {
            source: MatchSource::None,
            score: None,
            confidence: None,
        }
    }

    /// Oracle-confirmed match
    pub fn ai(score: f64, confidence: f64) -> Self {
        Self {
            source: MatchSource::Ai,
            score: Some(score),
            confidence: Some(confidence),
        }
    }
}

/// Attendance status, serialized as `0` / `1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AttendanceStatus {
    Absent,
    Present,
}

impl AttendanceStatus {
    /// `Present` iff `duration_minutes >= threshold_minutes`
    pub fn from_duration(duration_minutes: u32, threshold_minutes: u32) -> Self {
        if duration_minutes >= threshold_minutes {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }

    pub fn as_bit(&self) -> u8 {
        match self {
            AttendanceStatus::Absent => 0,
            AttendanceStatus::Present => 1,
        }
    }
}

impl From<AttendanceStatus> for u8 {
    fn from(status: AttendanceStatus) -> Self {
        status.as_bit()
    }
}

impl TryFrom<u8> for AttendanceStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AttendanceStatus::Absent),
            1 => Ok(AttendanceStatus::Present),
            other => Err(format!("invalid attendance status {}", other)),
        }
    }
}

/// Final per-mentee outcome, created once by the reconciliation loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResult {
    pub mentee: MenteeRecord,
    pub duration_minutes: u32,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    pub match_meta: MatchMeta,
}

/// Aggregate counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

impl Summary {
    pub fn from_results(results: &[AttendanceResult]) -> Self {
        let total = results.len();
        let present = results
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count();
        Self {
            total,
            present,
            absent: total - present,
        }
    }
}
