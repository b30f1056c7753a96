//! Shared test doubles for reconciliation tests

#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_common::{Error, Result};
use rollcall_match::adjudication::{Adjudication, Adjudicator, MatchType, Oracle, OracleError};
use rollcall_match::embedding::EmbeddingProvider;
use rollcall_match::matching::{best_match, Candidate, CandidateSelector};
use rollcall_match::models::{AttendeeRecord, MenteeRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One recorded adjudication request
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationCall {
    pub target: String,
    pub candidates: Vec<String>,
}

/// How the mock answers
pub enum Verdicts {
    /// Confirm every request
    ConfirmAll,
    /// Reject every request with `bestMatch = null`
    RejectAll,
    /// Confirm only the listed `(target, candidate)` pairs, reject the rest
    ConfirmPairs(HashSet<(String, String)>),
    /// Return `Err` for the listed targets, confirm the rest
    FailTargets(HashSet<String>),
}

/// Adjudicator double that records every call
pub struct MockAdjudicator {
    verdicts: Verdicts,
    calls: Mutex<Vec<AdjudicationCall>>,
}

impl MockAdjudicator {
    pub fn new(verdicts: Verdicts) -> Self {
        Self {
            verdicts,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn confirm_all() -> Self {
        Self::new(Verdicts::ConfirmAll)
    }

    pub fn reject_all() -> Self {
        Self::new(Verdicts::RejectAll)
    }

    pub fn calls(&self) -> Vec<AdjudicationCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn confirm(target: &str, candidate: &str) -> Adjudication {
    Adjudication {
        zoom_name: target.to_string(),
        best_match: Some(candidate.to_string()),
        confidence: 0.9,
        reason: Some("same person".to_string()),
        match_type: Some(MatchType::TokenTrim),
    }
}

fn reject(target: &str) -> Adjudication {
    Adjudication {
        zoom_name: target.to_string(),
        best_match: None,
        confidence: 0.2,
        reason: Some("only generic tokens overlap".to_string()),
        match_type: None,
    }
}

#[async_trait]
impl Adjudicator for MockAdjudicator {
    async fn adjudicate(&self, target: &str, candidates: &[String]) -> Result<Adjudication> {
        self.calls.lock().unwrap().push(AdjudicationCall {
            target: target.to_string(),
            candidates: candidates.to_vec(),
        });

        let candidate = candidates.first().map(String::as_str).unwrap_or_default();
        match &self.verdicts {
            Verdicts::ConfirmAll => Ok(confirm(target, candidate)),
            Verdicts::RejectAll => Ok(reject(target)),
            Verdicts::ConfirmPairs(pairs)
                if pairs.contains(&(target.to_string(), candidate.to_string())) =>
            {
                Ok(confirm(target, candidate))
            }
            Verdicts::ConfirmPairs(_) => Ok(reject(target)),
            Verdicts::FailTargets(targets) if targets.contains(target) => {
                Err(Error::Oracle("connection reset".to_string()))
            }
            Verdicts::FailTargets(_) => Ok(confirm(target, candidate)),
        }
    }
}

/// Oracle transport that replays fixed replies, then fails
pub struct ReplayOracle {
    replies: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl ReplayOracle {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::new(&[])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ReplayOracle {
    async fn generate(&self, _prompt: &str) -> std::result::Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| OracleError::Network("connection refused".to_string()))
    }
}

/// Rule selector that errors for the listed targets
pub struct FlakySelector {
    fail_for: HashSet<String>,
}

impl FlakySelector {
    pub fn failing_for(targets: &[&str]) -> Self {
        Self {
            fail_for: targets.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl CandidateSelector for FlakySelector {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn best_match(&self, target: &str, pool: &[String]) -> Result<Option<Candidate>> {
        if self.fail_for.contains(target) {
            return Err(Error::Oracle("embedding service unavailable".to_string()));
        }
        Ok(best_match(target, pool))
    }
}

/// Embedding provider whose every request fails
pub struct UnavailableProvider;

#[async_trait]
impl EmbeddingProvider for UnavailableProvider {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Oracle("embedding quota exhausted".to_string()))
    }
}

pub fn roster(names: &[&str]) -> Vec<MenteeRecord> {
    names.iter().map(|n| MenteeRecord::new(*n)).collect()
}

pub fn attendees(entries: &[(&str, u32)]) -> Vec<AttendeeRecord> {
    entries
        .iter()
        .map(|(name, minutes)| AttendeeRecord::new(*name, *minutes))
        .collect()
}
