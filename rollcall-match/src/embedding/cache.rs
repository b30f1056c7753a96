//! Content-addressed embedding cache (SQLite)
//!
//! Rows are keyed by the SHA-256 of the embedded corpus, so a changed
//! attendee list never reads stale vectors. Each row records when it was
//! written; [`EmbeddingCache::sweep_older_than`] expires by age.

use chrono::Utc;
use rollcall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default expiry for [`EmbeddingCache::sweep_older_than`]
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cached vectors for one corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEmbeddings {
    pub names: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub checksum: String,
}

impl CachedEmbeddings {
    fn is_consistent(&self) -> bool {
        self.names.len() == self.embeddings.len() && !self.checksum.is_empty()
    }
}

/// Hex SHA-256 of the newline-joined corpus
pub fn corpus_checksum<S: AsRef<str>>(names: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(name.as_ref().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// SQLite-backed embedding store
#[derive(Clone)]
pub struct EmbeddingCache {
    pool: SqlitePool,
}

impl EmbeddingCache {
    /// Open (or create) a cache file
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;
        info!("Embedding cache: {}", path.display());
        Self::with_pool(pool).await
    }

    /// Private in-memory cache (tests, one-off runs)
    pub async fn open_in_memory() -> Result<Self> {
        // One connection: every in-memory connection is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS embedding_cache (
                cache_key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Load an entry; missing or corrupt rows read as `None`
    pub async fn load(&self, key: &str) -> Result<Option<CachedEmbeddings>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM embedding_cache WHERE cache_key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((payload,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<CachedEmbeddings>(&payload) {
            Ok(entry) if entry.is_consistent() => {
                debug!(key = %key, count = entry.names.len(), "Embedding cache hit");
                Ok(Some(entry))
            }
            Ok(_) => {
                warn!(key = %key, "Cached embeddings have mismatched lengths, ignoring");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load cached embeddings");
                Ok(None)
            }
        }
    }

    /// Store an entry, best-effort
    ///
    /// A write failure is logged and swallowed; matching continues uncached.
    pub async fn save(&self, key: &str, entry: &CachedEmbeddings) {
        if let Err(e) = self.upsert(key, entry, Utc::now().timestamp_millis()).await {
            warn!(key = %key, error = %e, "Failed to save embeddings to cache");
        }
    }

    async fn upsert(&self, key: &str, entry: &CachedEmbeddings, created_at_ms: i64) -> Result<()> {
        let payload = serde_json::to_string(entry)
            .map_err(|e| Error::Cache(format!("Serialize embeddings failed: {}", e)))?;

        sqlx::query(
            "INSERT INTO embedding_cache (cache_key, payload, created_at) VALUES (?, ?, ?)
             ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at",
        )
        .bind(key)
        .bind(payload)
        .bind(created_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete entries older than `max_age` plus any whose payload no longer parses
    ///
    /// Returns the number of rows removed.
    pub async fn sweep_older_than(&self, max_age: Duration) -> Result<u64> {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(max_age_ms);

        let expired = sqlx::query("DELETE FROM embedding_cache WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT cache_key, payload FROM embedding_cache")
                .fetch_all(&self.pool)
                .await?;

        let mut corrupt = 0;
        for (key, payload) in rows {
            if serde_json::from_str::<CachedEmbeddings>(&payload).is_err() {
                corrupt += sqlx::query("DELETE FROM embedding_cache WHERE cache_key = ?")
                    .bind(&key)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();
            }
        }

        if expired + corrupt > 0 {
            info!(expired, corrupt, "Swept embedding cache");
        }
        Ok(expired + corrupt)
    }
}
