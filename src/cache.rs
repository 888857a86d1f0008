//! Durable snapshot cache.
//!
//! Persists exactly one snapshot at a time as a `{ meta, data }` record.
//! The write goes through a temp file in the same directory followed by a
//! rename, so a concurrent reader observes either the old record or the new
//! one, never meta without its blob. Freshness is not this module's concern:
//! the cache enforces no TTL, and the loader compares `generatedAt` tokens.

use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotMeta};
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

const CACHE_FILE: &str = "registry_cache.json";
const CACHE_TEMP_FILE: &str = "registry_cache.json.tmp";

/// On-disk record. Both logical keys of the store live in one document so
/// they are replaced together. Reads require both fields; a document missing
/// either is treated as a miss.
#[derive(Debug, Deserialize)]
struct CacheRecord {
    /// `registry_meta` key: the freshness token lives here.
    meta: SnapshotMeta,
    /// `registry_all_json` key: the full snapshot blob.
    data: Snapshot,
}

/// A cached snapshot as returned by [`SnapshotCache::get`].
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub meta: SnapshotMeta,
    pub data: Snapshot,
}

/// File-backed snapshot cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default per-user cache location.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("regidx"))
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    /// Reads the cached record.
    ///
    /// Returns `None` when no record exists or the stored document is
    /// unreadable or structurally incomplete (missing meta or data payload).
    /// Corruption is a cache miss, not an error.
    pub async fn get(&self) -> Option<CachedSnapshot> {
        let content = tokio::fs::read_to_string(self.record_path()).await.ok()?;
        let record: CacheRecord = serde_json::from_str(&content).ok()?;
        Some(CachedSnapshot {
            meta: record.meta,
            data: record.data,
        })
    }

    /// Atomically overwrites the cached record (meta and blob together).
    pub async fn put(&self, meta: &SnapshotMeta, data: &Snapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        let record = serde_json::json!({ "meta": meta, "data": data });
        let content = serde_json::to_string(&record).context("failed to serialize cache record")?;

        let temp_path = self.dir.join(CACHE_TEMP_FILE);
        tokio::fs::write(&temp_path, content)
            .await
            .with_context(|| format!("failed to write cache temp file {}", temp_path.display()))?;

        // Same-directory rename: the record swap is all-or-nothing.
        tokio::fs::rename(&temp_path, self.record_path())
            .await
            .with_context(|| {
                format!(
                    "failed to move cache record into place at {}",
                    self.record_path().display()
                )
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_snapshot() -> Snapshot {
        Snapshot::from_value(&json!({
            "meta": { "generatedAt": "2026-01-01T00:00:00Z" },
            "entries": [ { "namespace": "acme", "name": "tree", "latest": "1.0.0" } ]
        }))
    }

    #[tokio::test]
    async fn get_on_empty_cache_is_none() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        check!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let snapshot = sample_snapshot();

        cache.put(&snapshot.meta, &snapshot).await.unwrap();

        let_assert!(Some(cached) = cache.get().await);
        check!(cached.meta.generated_at == "2026-01-01T00:00:00Z");
        check!(cached.data.entries.len() == 1);
        check!(cached.data.entries[0].id() == "acme/tree");
    }

    #[tokio::test]
    async fn put_overwrites_the_previous_record() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let first = sample_snapshot();
        cache.put(&first.meta, &first).await.unwrap();

        let second = Snapshot::from_value(&json!({
            "meta": { "generatedAt": "2026-02-01T00:00:00Z" },
            "entries": []
        }));
        cache.put(&second.meta, &second).await.unwrap();

        let_assert!(Some(cached) = cache.get().await);
        check!(cached.meta.generated_at == "2026-02-01T00:00:00Z");
        check!(cached.data.is_empty());
    }

    #[tokio::test]
    async fn corrupt_record_is_a_cache_miss() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        tokio::fs::write(dir.path().join(CACHE_FILE), "{ not json")
            .await
            .unwrap();

        check!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn record_without_data_payload_is_a_cache_miss() {
        let dir = TempDir::new().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let meta_only = json!({ "meta": { "generatedAt": "2026-01-01T00:00:00Z" } });
        tokio::fs::write(dir.path().join(CACHE_FILE), meta_only.to_string())
            .await
            .unwrap();

        check!(cache.get().await.is_none());
    }
}
