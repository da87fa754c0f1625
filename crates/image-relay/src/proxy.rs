//! Fetch-or-serve logic in front of the remote store

use crate::error::{RelayError, Result};
use file_blob_cache::{
    CacheConfig, CacheEntry, CacheStats, CacheStore, ExpiryPolicy, SweepReport, Sweeper,
};
use github_content_store::RemoteStore;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_header(self) -> &'static str {
        match self {
            CacheOutcome::Hit => "HIT",
            CacheOutcome::Miss => "MISS",
        }
    }
}

/// A blob ready to be sent to the client
#[derive(Debug)]
pub struct Served {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub outcome: CacheOutcome,
}

/// Serves files from the local cache, falling back to the remote store.
///
/// No locking: two concurrent misses for the same key both fetch and both
/// write, and the last write wins.
pub struct ProxyCache {
    store: Arc<CacheStore>,
    policy: ExpiryPolicy,
    sweeper: Sweeper,
    size_budget: u64,
    remote: Arc<dyn RemoteStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProxyCache {
    pub fn new(store: Arc<CacheStore>, config: &CacheConfig, remote: Arc<dyn RemoteStore>) -> Self {
        let policy = ExpiryPolicy::new(config.expiry);
        Self {
            sweeper: Sweeper::new(store.clone(), policy),
            store,
            policy,
            size_budget: config.size_budget,
            remote,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Serve a file by key, from the cache when it holds a valid copy and
    /// from the remote store otherwise.
    ///
    /// A stale copy is never served, even when the remote fetch fails; it
    /// stays on disk until a sweep removes it or a fetch overwrites it.
    pub async fn fetch_or_serve(&self, key: &str) -> Result<Served> {
        CacheStore::validate_key(key)?;
        let content_type = content_type_for(key);

        if let Some(data) = self.cached(key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache hit");
            return Ok(Served {
                data,
                content_type,
                outcome: CacheOutcome::Hit,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Cache miss");

        let data = self.remote.fetch(key).await.map_err(|e| {
            warn!(key, error = %e, "Failed to fetch from remote store");
            RelayError::RemoteFetch(e)
        })?;

        if let Err(e) = self.store.write(key, &data).await {
            warn!(key, error = %e, "Failed to cache blob");
            // Continue even if caching fails
        }

        self.sweep_if_over_budget().await;

        Ok(Served {
            data,
            content_type,
            outcome: CacheOutcome::Miss,
        })
    }

    /// The cached bytes for a key, if present and still valid. Any failure
    /// along the way, including a sweep deleting the file mid-read, counts
    /// as a miss.
    async fn cached(&self, key: &str) -> Option<Vec<u8>> {
        let entry = match self.store.entry(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to stat cached file");
                return None;
            }
        };

        if !self.policy.is_valid(&entry) {
            debug!(key, last_modified = %entry.last_modified, "Cached file is stale");
            return None;
        }

        self.read_entry(&entry).await
    }

    /// Bytes of an entry that was already looked up and found valid
    async fn read_entry(&self, entry: &CacheEntry) -> Option<Vec<u8>> {
        let key = entry.name.as_str();
        match self.store.read(key).await {
            Ok(data) => Some(data),
            Err(e) if e.is_not_found() => {
                debug!(key, "Cached file disappeared before it could be read");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached file");
                None
            }
        }
    }

    /// Sweep expired entries when the cache has grown past its budget.
    ///
    /// Only expired entries are removed, so the cache can stay over budget
    /// when everything in it is still fresh.
    pub async fn sweep_if_over_budget(&self) -> Option<SweepReport> {
        let stats = self.store.stats().await;
        if stats.total_size_bytes <= self.size_budget {
            return None;
        }

        info!(
            total_size_bytes = stats.total_size_bytes,
            size_budget = self.size_budget,
            "Cache over budget, sweeping"
        );
        let report = self.sweeper.sweep().await;

        if report.freed_bytes == 0 {
            warn!(
                size_budget = self.size_budget,
                "Cache still over budget, no expired entries to remove"
            );
        }
        Some(report)
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweeper.sweep().await
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn size_budget(&self) -> u64 {
        self.size_budget
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.stats().await
    }

    /// (hits, misses) since startup
    pub fn counters(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// Content type for a key, inferred from its extension
pub fn content_type_for(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}
