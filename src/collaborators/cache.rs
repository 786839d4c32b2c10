use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::candidates::RawCandidates;

const CACHE_SCHEMA_VERSION: &str = "1";

/// SQLite store of raw collaborator output, so reruns skip retrieval.
pub struct CandidateCache {
    connection: Connection,
}

impl CandidateCache {
    pub fn open(path: &Path) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open candidate cache: {}", path.display()))?;
        let cache = Self::from_connection(connection)?;
        info!(path = %path.display(), entries = cache.len()?, "opened candidate cache");
        Ok(cache)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS cache_metadata (
                  key TEXT PRIMARY KEY,
                  value TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS candidate_cache (
                  cache_key TEXT PRIMARY KEY,
                  strategy TEXT NOT NULL,
                  question TEXT NOT NULL,
                  payload TEXT NOT NULL,
                  created_at TEXT NOT NULL
                );
                ",
            )
            .context("failed to create candidate cache schema")?;
        connection
            .execute(
                "INSERT OR IGNORE INTO cache_metadata (key, value) VALUES ('schema_version', ?1)",
                params![CACHE_SCHEMA_VERSION],
            )
            .context("failed to record candidate cache schema version")?;

        Ok(Self { connection })
    }

    pub fn load(&self, cache_key: &str) -> Result<Option<RawCandidates>> {
        let payload = self
            .connection
            .query_row(
                "SELECT payload FROM candidate_cache WHERE cache_key = ?1",
                params![cache_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("failed to query candidate cache")?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .with_context(|| format!("corrupt candidate cache entry: {cache_key}"))
            })
            .transpose()
    }

    pub fn store(
        &self,
        cache_key: &str,
        question: &str,
        strategy: &str,
        candidates: &RawCandidates,
    ) -> Result<()> {
        let payload =
            serde_json::to_string(candidates).context("failed to serialize cached candidates")?;

        self.connection
            .execute(
                "
                INSERT OR REPLACE INTO candidate_cache (cache_key, strategy, question, payload, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![cache_key, strategy, question, payload, Utc::now()],
            )
            .context("failed to write candidate cache entry")?;

        Ok(())
    }

    pub fn len(&self) -> Result<i64> {
        let count = self
            .connection
            .query_row("SELECT COUNT(*) FROM candidate_cache", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// Stable key over everything that changes the collaborator output.
pub fn cache_key(index: &str, strategy: &str, num_hits: usize, depth: usize, question: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [index, strategy, &num_hits.to_string(), &depth.to_string(), question] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
