//! Rollcall matching engine
//!
//! Reconciles an enrolled roster against session-call attendance: rule-based
//! candidate generation, a greedy one-to-one assignment and oracle
//! adjudication of every admitted candidate.

pub mod adjudication;
pub mod embedding;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod reconcile;
pub mod report;
pub mod sources;

pub use adjudication::{Adjudication, Adjudicator, GeminiClient, OracleAdjudicator, RetryPolicy};
pub use matching::{Candidate, CandidateSelector, RuleSelector};
pub use models::{AttendanceResult, AttendanceStatus, AttendeeRecord, MatchMeta, MatchSource, MenteeRecord, Summary};
pub use reconcile::{MatchSettings, Reconciler, RunReport, RunState};
pub use sources::{AttendeeSource, RosterSource};
