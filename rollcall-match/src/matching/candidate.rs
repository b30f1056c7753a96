//! Candidate selection: best pool entry for one target name

use super::normalize::variations;
use super::similarity::similarity;
use async_trait::async_trait;
use rollcall_common::Result;
use serde::Serialize;

/// Top-scoring pool entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub score: f64,
}

/// Candidate generator seam
///
/// The reconciliation loop only needs the single best `(name, score)` pair;
/// implementations differ in how they score.
#[async_trait]
pub trait CandidateSelector: Send + Sync {
    /// Selector name for provenance in logs
    fn name(&self) -> &'static str;

    /// Best entry of `pool` for `target`, or `None` when `pool` is empty
    async fn best_match(&self, target: &str, pool: &[String]) -> Result<Option<Candidate>>;
}

/// Variation-expanded rule-based selector (the default path)
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSelector;

#[async_trait]
impl CandidateSelector for RuleSelector {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn best_match(&self, target: &str, pool: &[String]) -> Result<Option<Candidate>> {
        Ok(best_match(target, pool))
    }
}

/// Best pool entry by rule-based similarity
///
/// Each entry scores the maximum of `similarity` over the cross product of
/// target variations and its own variations. The strict maximum wins; ties
/// keep the first entry in pool order.
pub fn best_match<S: AsRef<str>>(target: &str, pool: &[S]) -> Option<Candidate> {
    let target_variations = variations(target);
    let mut best: Option<Candidate> = None;

    for entry in pool {
        let entry = entry.as_ref();
        let entry_variations = variations(entry);

        let score = target_variations
            .iter()
            .flat_map(|t| entry_variations.iter().map(move |e| similarity(t, e)))
            .fold(f64::NEG_INFINITY, f64::max);

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Candidate {
                name: entry.to_string(),
                score,
            });
        }
    }

    best
}
