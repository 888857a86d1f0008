//! Cache-first snapshot loading with background refresh.
//!
//! `load()` never makes the caller wait on the network when a cached snapshot
//! exists: the cache answers immediately and a fire-and-forget refresh runs
//! behind it, overwriting the cache only when the fetched `generatedAt` token
//! differs. Only a cold cache pays for a synchronous fetch. Background
//! failures are a log-level concern; cold-path failures propagate.

use crate::cache::SnapshotCache;
use crate::error::Result;
use crate::fetch::{FetchError, SnapshotFetcher};
use crate::snapshot::Snapshot;
use anyhow::Context;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Timeout for the opportunistic background refresh. Failure is cheap, so
/// this is short.
pub const REFRESH_TIMEOUT: Duration = Duration::from_millis(2500);

/// Timeout for the user-visible cold-path fetch.
pub const COLD_TIMEOUT: Duration = Duration::from_millis(6000);

/// Window during which repeated `load()` calls skip spawning another remote
/// refresh. Purely an economy measure, not a correctness mechanism.
const REFRESH_DEBOUNCE: Duration = Duration::from_secs(30);

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Network,
}

/// Result of one `load()` call.
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub source: SnapshotSource,
    pub data: Snapshot,
}

/// Orchestrates "serve cached snapshot now, refresh behind the caller".
#[derive(Debug)]
pub struct IndexLoader<F> {
    cache: SnapshotCache,
    fetcher: Arc<F>,
    url: String,
    last_refresh: Mutex<Option<Instant>>,
}

impl<F: SnapshotFetcher> IndexLoader<F> {
    pub fn new(cache: SnapshotCache, fetcher: F, url: impl Into<String>) -> Self {
        Self {
            cache,
            fetcher: Arc::new(fetcher),
            url: url.into(),
            last_refresh: Mutex::new(None),
        }
    }

    /// Loads a snapshot with minimum latency.
    ///
    /// Cached path: return the cached snapshot and kick off a background
    /// refresh keyed on its freshness token; this call has already returned
    /// by the time the refresh settles, so a newer snapshot is observed by
    /// the *next* `load()`. Cold path: fetch synchronously, store, return.
    pub async fn load(&self) -> Result<LoadedSnapshot> {
        if let Some(cached) = self.cache.get().await {
            tracing::debug!(version = %cached.meta.generated_at, "serving snapshot from cache");
            self.spawn_background_refresh(cached.meta.generated_at.clone());
            return Ok(LoadedSnapshot {
                source: SnapshotSource::Cache,
                data: cached.data,
            });
        }

        tracing::debug!(url = %self.url, "cache empty, fetching snapshot");
        let snapshot = bounded_fetch(self.fetcher.as_ref(), &self.url, COLD_TIMEOUT)
            .await
            .with_context(|| format!("failed to fetch registry snapshot from {}", self.url))?;

        self.cache.put(&snapshot.meta, &snapshot).await?;

        Ok(LoadedSnapshot {
            source: SnapshotSource::Network,
            data: snapshot,
        })
    }

    /// Runs one refresh cycle against the cached freshness token.
    ///
    /// Overwrites the cache iff the fetch succeeds and the fetched token is
    /// non-empty and differs from `current_version` (equal tokens are "not
    /// newer"). All failures are swallowed with a log line.
    pub async fn refresh(&self, current_version: &str) {
        run_refresh(
            Arc::clone(&self.fetcher),
            self.cache.clone(),
            self.url.clone(),
            current_version.to_string(),
        )
        .await;
    }

    fn spawn_background_refresh(&self, current_version: String) {
        if !self.claim_refresh_slot() {
            tracing::trace!("skipping background refresh inside debounce window");
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let cache = self.cache.clone();
        let url = self.url.clone();
        tokio::spawn(run_refresh(fetcher, cache, url, current_version));
    }

    /// Returns true when this call owns the next refresh slot.
    fn claim_refresh_slot(&self) -> bool {
        let Ok(mut last) = self.last_refresh.lock() else {
            return false;
        };
        if last.is_some_and(|at| at.elapsed() < REFRESH_DEBOUNCE) {
            return false;
        }
        *last = Some(Instant::now());
        true
    }
}

async fn run_refresh<F: SnapshotFetcher>(
    fetcher: Arc<F>,
    cache: SnapshotCache,
    url: String,
    current_version: String,
) {
    match bounded_fetch(fetcher.as_ref(), &url, REFRESH_TIMEOUT).await {
        Ok(snapshot) => {
            let fetched = snapshot.version();
            if fetched.is_empty() || fetched == current_version {
                tracing::trace!(version = %current_version, "background refresh: snapshot unchanged");
                return;
            }

            // Last write wins; concurrent refreshes store idempotent records.
            match cache.put(&snapshot.meta, &snapshot).await {
                Ok(()) => {
                    tracing::info!(from = %current_version, to = %fetched, "cached snapshot refreshed");
                }
                Err(err) => {
                    tracing::warn!("background refresh: failed to store snapshot: {err:#}");
                }
            }
        }
        Err(err) => {
            tracing::debug!("background refresh failed: {err}");
        }
    }
}

/// Bounds any fetcher impl to `timeout`; a timed-out fetch simply discards
/// its result.
async fn bounded_fetch<F: SnapshotFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
) -> std::result::Result<Snapshot, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
