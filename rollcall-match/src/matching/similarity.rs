//! Rule-based name similarity

use super::normalize::normalize;

/// Score assigned when one normalized name contains the other
pub const CONTAINMENT_SCORE: f64 = 0.8;

/// Similarity between two names
///
/// 1. equal after normalization → 1.0
/// 2. either contains the other → 0.8
/// 3. otherwise token overlap over tokens longer than 2 chars:
///    matching ordered pairs / max(token counts)
///
/// Rule 3 counts every matching `(t1, t2)` pair, so repeated tokens can push
/// the score above 1.0. The value is not clamped.
pub fn similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize(a);
    let norm_b = normalize(b);

    if norm_a == norm_b {
        return 1.0;
    }

    if norm_a.contains(norm_b.as_str()) || norm_b.contains(norm_a.as_str()) {
        return CONTAINMENT_SCORE;
    }

    let tokens_a = meaningful_tokens(&norm_a);
    let tokens_b = meaningful_tokens(&norm_b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let matching = tokens_a
        .iter()
        .flat_map(|t1| tokens_b.iter().map(move |t2| (*t1, *t2)))
        .filter(|(t1, t2)| t1 == t2 || t1.contains(t2) || t2.contains(t1))
        .count();

    matching as f64 / tokens_a.len().max(tokens_b.len()) as f64
}

fn meaningful_tokens(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|t| t.len() > 2).collect()
}
