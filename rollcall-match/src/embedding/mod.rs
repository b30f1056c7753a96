//! Embedding-based candidate generation
//!
//! Alternative to [`RuleSelector`](crate::matching::RuleSelector) behind the
//! same [`CandidateSelector`] contract: names are embedded, and the pool entry
//! with the highest cosine similarity to the target wins.

pub mod cache;

pub use cache::{corpus_checksum, CachedEmbeddings, EmbeddingCache};

use crate::adjudication::GeminiClient;
use crate::matching::{Candidate, CandidateSelector};
use async_trait::async_trait;
use rollcall_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Default number of candidates returned by [`top_k_candidates`]
pub const DEFAULT_TOP_K: usize = 6;

/// Word sequences removed before embedding (program labels, not names)
const PROGRAM_PHRASES: [&[&str]; 4] = [
    &["web", "development"],
    &["web", "dev"],
    &["artificial", "intelligence"],
    &["ai"],
];

/// Text embedding capability
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_embed(texts)
            .await
            .map_err(|e| Error::Oracle(format!("Failed to get embeddings: {}", e)))
    }
}

/// Prepare a name for embedding
///
/// Lower-cases, turns `_ - ( )` into spaces and drops whole-word program
/// labels (`web development`, `web dev`, `ai`, `artificial intelligence`).
pub fn normalize_for_embedding(text: &str) -> String {
    let spaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '(' | ')') { ' ' } else { c })
        .collect();
    let tokens: Vec<&str> = spaced.split_whitespace().collect();

    let mut kept = Vec::with_capacity(tokens.len());
    let mut i = 0;
    'outer: while i < tokens.len() {
        for phrase in PROGRAM_PHRASES {
            if tokens[i..].starts_with(phrase) {
                i += phrase.len();
                continue 'outer;
            }
        }
        kept.push(tokens[i]);
        i += 1;
    }

    kept.join(" ")
}

/// Cosine similarity; 0 for empty, mismatched or zero-magnitude vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        dot / magnitude
    }
}

/// Top `k` names by cosine similarity to `query`, best first
///
/// Equal scores keep their input order.
pub fn top_k_candidates(
    query: &[f32],
    vectors: &[Vec<f32>],
    names: &[String],
    k: usize,
) -> Result<Vec<Candidate>> {
    if vectors.len() != names.len() {
        return Err(Error::Internal(format!(
            "Embeddings and names must have the same length ({} vs {})",
            vectors.len(),
            names.len()
        )));
    }

    let mut candidates: Vec<Candidate> = vectors
        .iter()
        .zip(names)
        .map(|(vector, name)| Candidate {
            name: name.clone(),
            score: cosine_similarity(query, vector),
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(k);
    Ok(candidates)
}

/// Embedding candidate selector
///
/// Vectors are memoized per name for the selector's lifetime. Pool batches are
/// also written to the optional persistent cache, keyed by corpus checksum.
pub struct EmbeddingSelector<P> {
    provider: P,
    cache: Option<EmbeddingCache>,
    memo: Mutex<HashMap<String, Vec<f32>>>,
}

impl<P: EmbeddingProvider> EmbeddingSelector<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cache: None,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ensure every name has a memoized vector
    async fn ensure_embedded(&self, names: &[String]) -> Result<()> {
        let missing: Vec<String> = {
            let memo = self.lock_memo()?;
            let mut missing: Vec<String> = Vec::new();
            for name in names {
                if !memo.contains_key(name) && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
            missing
        };

        if missing.is_empty() {
            return Ok(());
        }

        let checksum = corpus_checksum(&missing);
        let cached = match &self.cache {
            Some(cache) => cache
                .load(&checksum)
                .await?
                .filter(|entry| entry.names == missing),
            None => None,
        };

        let vectors = match cached {
            Some(entry) => entry.embeddings,
            None => {
                let texts: Vec<String> =
                    missing.iter().map(|n| normalize_for_embedding(n)).collect();
                let vectors = self.provider.embed(&texts).await?;
                if vectors.len() != missing.len() {
                    return Err(Error::Oracle(format!(
                        "expected {} embeddings, got {}",
                        missing.len(),
                        vectors.len()
                    )));
                }
                if let Some(cache) = &self.cache {
                    let entry = CachedEmbeddings {
                        names: missing.clone(),
                        embeddings: vectors.clone(),
                        checksum: checksum.clone(),
                    };
                    cache.save(&checksum, &entry).await;
                }
                vectors
            }
        };

        debug!(count = missing.len(), "Embedded names");
        let mut memo = self.lock_memo()?;
        memo.extend(missing.into_iter().zip(vectors));
        Ok(())
    }

    fn lock_memo(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<f32>>>> {
        self.memo
            .lock()
            .map_err(|_| Error::Internal("Embedding memo lock poisoned".to_string()))
    }
}

#[async_trait]
impl<P: EmbeddingProvider> CandidateSelector for EmbeddingSelector<P> {
    fn name(&self) -> &'static str {
        "embedding"
    }

    async fn best_match(&self, target: &str, pool: &[String]) -> Result<Option<Candidate>> {
        if pool.is_empty() {
            return Ok(None);
        }

        let target = target.to_string();
        self.ensure_embedded(pool).await?;
        self.ensure_embedded(std::slice::from_ref(&target)).await?;

        let (query, vectors) = {
            let memo = self.lock_memo()?;
            let lookup = |name: &String| {
                memo.get(name)
                    .cloned()
                    .ok_or_else(|| Error::Internal(format!("No embedding for {:?}", name)))
            };
            let query = lookup(&target)?;
            let vectors = pool.iter().map(lookup).collect::<Result<Vec<_>>>()?;
            (query, vectors)
        };

        let top = top_k_candidates(&query, &vectors, pool, 1)?;
        Ok(top.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic provider: letter-frequency vectors, counts calls
    struct LetterProvider {
        calls: AtomicUsize,
        texts_seen: AtomicUsize,
    }

    impl LetterProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                texts_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LetterProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_for_embedding() {
        assert_eq!(normalize_for_embedding("Klaudio_AI"), "klaudio");
        assert_eq!(normalize_for_embedding("bella_Web Dev"), "bella");
        assert_eq!(
            normalize_for_embedding("Rina (Web Development) Sari"),
            "rina sari"
        );
        assert_eq!(
            normalize_for_embedding("Tono_Artificial-Intelligence"),
            "tono"
        );
        // Whole words only
        assert_eq!(normalize_for_embedding("Aisyah Webster"), "aisyah webster");
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_top_k_order_and_truncation() {
        let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let pool = names(&["far", "first-tie", "second-tie", "mid"]);

        let top = top_k_candidates(&[1.0, 0.0], &vectors, &pool, 3).unwrap();
        let order: Vec<&str> = top.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["first-tie", "second-tie", "mid"]);

        assert!(top_k_candidates(&[1.0], &vectors, &pool[..2], DEFAULT_TOP_K).is_err());
    }

    #[tokio::test]
    async fn test_selector_picks_nearest_and_memoizes() {
        let selector = EmbeddingSelector::new(LetterProvider::new());
        let pool = names(&["Agnes Monika", "Klaudio P.H"]);

        let best = selector.best_match("Klaudio_AI", &pool).await.unwrap().unwrap();
        assert_eq!(best.name, "Klaudio P.H");

        // Pool already embedded: only a new target is requested
        selector.best_match("Agnes", &pool).await.unwrap();
        assert_eq!(selector.provider.texts_seen.load(Ordering::SeqCst), 4);

        let empty: Vec<String> = Vec::new();
        assert!(selector.best_match("x", &empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_selector_reads_persistent_cache() {
        let cache = EmbeddingCache::open_in_memory().await.unwrap();
        let pool = names(&["Agnes Monika", "Klaudio P.H"]);

        let first = EmbeddingSelector::new(LetterProvider::new()).with_cache(cache.clone());
        first.best_match("Klaudio_AI", &pool).await.unwrap();

        let second = EmbeddingSelector::new(LetterProvider::new()).with_cache(cache);
        let best = second.best_match("Klaudio_AI", &pool).await.unwrap().unwrap();
        assert_eq!(best.name, "Klaudio P.H");
        // Pool and target batches were both written by the first selector
        assert_eq!(second.provider.calls.load(Ordering::SeqCst), 0);
    }
}
