//! Rule-based matching heuristics
//!
//! Normalizer → Similarity Scorer → Candidate Selector. Everything here is
//! pure and synchronous apart from the `CandidateSelector` seam.

pub mod candidate;
pub mod normalize;
pub mod similarity;

pub use candidate::{best_match, Candidate, CandidateSelector, RuleSelector};
pub use normalize::{normalize, variations};
pub use similarity::similarity;
