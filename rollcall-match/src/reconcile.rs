//! Reconciliation loop
//!
//! Walks the roster in order, proposes the best unclaimed attendee for each
//! mentee, gates weak proposals, asks the adjudicator to confirm the rest and
//! records one [`AttendanceResult`] per mentee. Assignment is greedy: the
//! first mentee to claim an attendee name keeps it.

use crate::adjudication::Adjudicator;
use crate::matching::{Candidate, CandidateSelector};
use crate::models::{
    AttendanceResult, AttendanceStatus, AttendeeRecord, MatchMeta, MenteeRecord, Summary,
};
use crate::sources::{AttendeeSource, RosterSource};
use chrono::{DateTime, Utc};
use rollcall_common::config::MatchingConfig;
use rollcall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    LoadingRoster,
    LoadingAttendees,
    Matching,
    Summarizing,
    Done,
    Failed,
}

impl RunState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, LoadingRoster)
            | (LoadingRoster, LoadingAttendees)
            | (LoadingAttendees, Matching)
            | (Matching, Summarizing)
            | (Summarizing, Done) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone)]
pub struct RunTracker {
    pub run_id: Uuid,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move to `new_state`
    ///
    /// # Errors
    /// `Error::Internal` when the transition is not part of the lifecycle
    pub fn transition_to(&mut self, new_state: RunState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(Error::Internal(format!(
                "Invalid run state transition {:?} -> {:?}",
                self.state, new_state
            )));
        }

        info!(
            run_id = %self.run_id,
            from = ?self.state,
            to = ?new_state,
            "Run state changed"
        );
        self.state = new_state;
        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Wall-clock time from start to the terminal state (or now)
    pub fn elapsed_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Attendee names already assigned during one run
#[derive(Debug, Default)]
pub struct ClaimedNames {
    names: HashSet<String>,
}

impl ClaimedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`; false when it was already claimed
    pub fn claim(&mut self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Name-keyed attendee lookup
///
/// `names` keeps first-seen order; `records` holds the last record written
/// under each name.
struct AttendeeIndex {
    names: Vec<String>,
    records: HashMap<String, AttendeeRecord>,
}

impl AttendeeIndex {
    fn build(attendees: Vec<AttendeeRecord>) -> Self {
        let mut names = Vec::new();
        let mut records: HashMap<String, AttendeeRecord> = HashMap::new();

        for attendee in attendees {
            match records.get(&attendee.name) {
                Some(previous) => warn!(
                    attendee = %attendee.name,
                    previous_duration = previous.duration_minutes,
                    duration = attendee.duration_minutes,
                    "Duplicate attendee name, keeping the later record"
                ),
                None => names.push(attendee.name.clone()),
            }
            records.insert(attendee.name.clone(), attendee);
        }

        Self { names, records }
    }

    fn unclaimed(&self, claimed: &ClaimedNames) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !claimed.contains(name))
            .cloned()
            .collect()
    }

    fn duration_of(&self, name: &str) -> u32 {
        self.records.get(name).map_or(0, |a| a.duration_minutes)
    }
}

/// Thresholds for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Candidates scoring below this never reach the adjudicator
    pub admission_threshold: f64,
    /// Minutes required for `Present`
    pub present_threshold_minutes: u32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            admission_threshold: 0.2,
            present_threshold_minutes: 30,
        }
    }
}

impl From<&MatchingConfig> for MatchSettings {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            admission_threshold: config.admission_threshold,
            present_threshold_minutes: config.present_threshold_minutes,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub results: Vec<AttendanceResult>,
    pub summary: Summary,
}

impl RunReport {
    /// Status bits in roster order, one per line
    pub fn binary_export(&self) -> String {
        self.results
            .iter()
            .map(|r| r.status.as_bit().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reconciliation engine
pub struct Reconciler<S, A> {
    selector: S,
    adjudicator: A,
    settings: MatchSettings,
}

impl<S: CandidateSelector, A: Adjudicator> Reconciler<S, A> {
    pub fn new(selector: S, adjudicator: A, settings: MatchSettings) -> Self {
        Self {
            selector,
            adjudicator,
            settings,
        }
    }

    pub fn adjudicator(&self) -> &A {
        &self.adjudicator
    }

    /// Load both sources and reconcile them
    ///
    /// # Errors
    /// Any source error fails the run; no partial report is returned.
    pub async fn run<R, T>(&self, roster_source: &R, attendee_source: &T) -> Result<RunReport>
    where
        R: RosterSource + ?Sized,
        T: AttendeeSource + ?Sized,
    {
        let mut tracker = RunTracker::new();
        match self.drive(&mut tracker, roster_source, attendee_source).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(run_id = %tracker.run_id, error = %e, "Run failed");
                if !tracker.state.is_terminal() {
                    tracker.transition_to(RunState::Failed)?;
                }
                Err(e)
            }
        }
    }

    async fn drive<R, T>(
        &self,
        tracker: &mut RunTracker,
        roster_source: &R,
        attendee_source: &T,
    ) -> Result<RunReport>
    where
        R: RosterSource + ?Sized,
        T: AttendeeSource + ?Sized,
    {
        tracker.transition_to(RunState::LoadingRoster)?;
        let roster = roster_source.load().await?;

        tracker.transition_to(RunState::LoadingAttendees)?;
        let attendees = attendee_source.load().await?;

        info!(
            run_id = %tracker.run_id,
            mentees = roster.len(),
            attendees = attendees.len(),
            selector = self.selector.name(),
            "Sources loaded"
        );

        tracker.transition_to(RunState::Matching)?;
        let results = self.match_all(tracker.run_id, &roster, attendees).await;

        tracker.transition_to(RunState::Summarizing)?;
        let summary = Summary::from_results(&results);

        tracker.transition_to(RunState::Done)?;
        info!(
            run_id = %tracker.run_id,
            total = summary.total,
            present = summary.present,
            absent = summary.absent,
            elapsed_ms = tracker.elapsed_ms(),
            "Run complete"
        );

        Ok(RunReport {
            run_id: tracker.run_id,
            results,
            summary,
        })
    }

    /// Reconcile in-memory lists (matching and summary only)
    pub async fn reconcile(
        &self,
        roster: &[MenteeRecord],
        attendees: Vec<AttendeeRecord>,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let results = self.match_all(run_id, roster, attendees).await;
        let summary = Summary::from_results(&results);
        RunReport {
            run_id,
            results,
            summary,
        }
    }

    async fn match_all(
        &self,
        run_id: Uuid,
        roster: &[MenteeRecord],
        attendees: Vec<AttendeeRecord>,
    ) -> Vec<AttendanceResult> {
        let index = AttendeeIndex::build(attendees);
        let mut claimed = ClaimedNames::new();
        let mut results = Vec::with_capacity(roster.len());

        for (position, mentee) in roster.iter().enumerate() {
            let matched = match self.match_one(mentee, &index, &claimed).await {
                Ok(matched) => matched,
                Err(e) if e.is_unexpected() => {
                    error!(
                        run_id = %run_id,
                        mentee = %mentee.name,
                        position,
                        error = %e,
                        "Unexpected matching failure, recording no match"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        mentee = %mentee.name,
                        position,
                        error = %e,
                        "Matching failed for mentee, recording no match"
                    );
                    None
                }
            };

            let result = match matched {
                Some((candidate, confidence)) => {
                    claimed.claim(&candidate.name);
                    let duration_minutes = index.duration_of(&candidate.name);
                    debug!(
                        run_id = %run_id,
                        mentee = %mentee.name,
                        attendee = %candidate.name,
                        score = candidate.score,
                        confidence,
                        "Matched"
                    );
                    AttendanceResult {
                        mentee: mentee.clone(),
                        duration_minutes,
                        status: AttendanceStatus::from_duration(
                            duration_minutes,
                            self.settings.present_threshold_minutes,
                        ),
                        matched_name: (candidate.name != mentee.name).then(|| candidate.name.clone()),
                        match_meta: MatchMeta::ai(candidate.score, confidence),
                    }
                }
                None => AttendanceResult {
                    mentee: mentee.clone(),
                    duration_minutes: 0,
                    status: AttendanceStatus::from_duration(
                        0,
                        self.settings.present_threshold_minutes,
                    ),
                    matched_name: None,
                    match_meta: MatchMeta::none(),
                },
            };
            results.push(result);
        }

        results
    }

    /// Confirmed `(candidate, confidence)` for one mentee, if any
    async fn match_one(
        &self,
        mentee: &MenteeRecord,
        index: &AttendeeIndex,
        claimed: &ClaimedNames,
    ) -> Result<Option<(Candidate, f64)>> {
        let pool = index.unclaimed(claimed);
        let Some(candidate) = self.selector.best_match(&mentee.name, &pool).await? else {
            debug!(mentee = %mentee.name, "No unclaimed attendees left");
            return Ok(None);
        };

        if candidate.score < self.settings.admission_threshold {
            debug!(
                mentee = %mentee.name,
                candidate = %candidate.name,
                score = candidate.score,
                "Candidate below admission threshold"
            );
            return Ok(None);
        }

        let verdict = self
            .adjudicator
            .adjudicate(&candidate.name, std::slice::from_ref(&mentee.name))
            .await?;

        if verdict.is_match() {
            Ok(Some((candidate, verdict.confidence)))
        } else {
            debug!(
                mentee = %mentee.name,
                candidate = %candidate.name,
                confidence = verdict.confidence,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Adjudicator rejected candidate"
            );
            Ok(None)
        }
    }
}
