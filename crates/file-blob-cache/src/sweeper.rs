//! Deletion of expired cache entries

use crate::expiry::ExpiryPolicy;
use crate::store::CacheStore;
use crate::types::{CacheEntry, EntryFailure};
use serde::Serialize;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub deleted_count: usize,
    pub freed_bytes: u64,
    pub failures: Vec<EntryFailure>,
}

/// Removes every entry the expiry policy rejects
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: Arc<CacheStore>,
    policy: ExpiryPolicy,
}

impl Sweeper {
    pub fn new(store: Arc<CacheStore>, policy: ExpiryPolicy) -> Self {
        Self { store, policy }
    }

    /// Delete all expired entries.
    ///
    /// Never fails: entries that cannot be listed or deleted are reported in
    /// [`SweepReport::failures`] and the sweep moves on. Entries that vanish
    /// before they can be deleted are skipped.
    pub async fn sweep(&self) -> SweepReport {
        let expired = self.policy.list_expired(&self.store).await;

        let mut report = self.delete_entries(expired.entries).await;
        let mut failures = expired.failures;
        failures.append(&mut report.failures);
        report.failures = failures;

        if report.deleted_count > 0 || !report.failures.is_empty() {
            info!(
                cache_dir = ?self.store.dir(),
                deleted = report.deleted_count,
                freed_bytes = report.freed_bytes,
                failures = report.failures.len(),
                "Swept expired cache entries"
            );
        } else {
            debug!(cache_dir = ?self.store.dir(), "Sweep found nothing to delete");
        }

        report
    }

    async fn delete_entries(&self, entries: Vec<CacheEntry>) -> SweepReport {
        let mut report = SweepReport::default();

        for entry in entries {
            match fs::remove_file(&entry.path).await {
                Ok(()) => {
                    report.deleted_count += 1;
                    report.freed_bytes += entry.size_bytes;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(key = %entry.name, "Expired entry already removed");
                }
                Err(e) => {
                    warn!(key = %entry.name, error = %e, "Failed to delete expired entry");
                    report.failures.push(EntryFailure {
                        path: entry.path,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Run [`Sweeper::sweep`] every `period`, starting one period from now.
    /// A zero period, or one too large to schedule, disables the timer.
    pub fn spawn_periodic(self, period: Duration) -> JoinHandle<()> {
        if period.is_zero() {
            warn!("Sweep interval is zero, periodic sweeping disabled");
            return tokio::spawn(async {});
        }
        let Some(start) = Instant::now().checked_add(period) else {
            warn!(
                period_secs = period.as_secs(),
                "Sweep interval is out of range, periodic sweeping disabled"
            );
            return tokio::spawn(async {});
        };

        tokio::spawn(async move {
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::backdate;
    use chrono::Utc;
    use tempfile::tempdir;

    const EXPIRY: Duration = Duration::from_secs(3600);

    async fn test_sweeper() -> (tempfile::TempDir, Arc<CacheStore>, Sweeper) {
        let dir = tempdir().unwrap();
        let store = Arc::new(CacheStore::new(dir.path().to_path_buf()));
        store.init().await.unwrap();
        let sweeper = Sweeper::new(store.clone(), ExpiryPolicy::new(EXPIRY));
        (dir, store, sweeper)
    }

    async fn write_expired(store: &CacheStore, key: &str, data: &[u8]) {
        let entry = store.write(key, data).await.unwrap();
        backdate(&entry.path, EXPIRY + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entry() {
        let (_dir, store, sweeper) = test_sweeper().await;
        write_expired(&store, "old.png", b"0123456789").await;

        let expired = ExpiryPolicy::new(EXPIRY).list_expired(&store).await;
        assert_eq!(expired.entries.len(), 1);

        let report = sweeper.sweep().await;
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.freed_bytes, 10);
        assert!(report.failures.is_empty());
        assert!(store.read("old.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_second_sweep_is_empty() {
        let (_dir, store, sweeper) = test_sweeper().await;
        write_expired(&store, "a.png", b"aaaa").await;
        write_expired(&store, "b.png", b"bb").await;
        store.write("c.png", b"fresh").await.unwrap();

        let first = sweeper.sweep().await;
        assert_eq!(first.deleted_count, 2);
        assert_eq!(first.freed_bytes, 6);

        let second = sweeper.sweep().await;
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn test_sweep_keeps_valid_entries() {
        let (_dir, store, sweeper) = test_sweeper().await;
        for key in ["v1.png", "v2.png", "v3.png"] {
            store.write(key, b"valid").await.unwrap();
        }
        for key in ["e1.png", "e2.png"] {
            write_expired(&store, key, b"expired").await;
        }

        assert_eq!(store.stats().await.total_files, 5);

        let report = sweeper.sweep().await;
        assert_eq!(report.deleted_count, 2);

        let stats = store.stats().await;
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size_bytes, 15);
    }

    #[tokio::test]
    async fn test_delete_failures_do_not_abort() {
        let (dir, _store, sweeper) = test_sweeper().await;
        let now = Utc::now();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let real = dir.path().join("real.png");
        std::fs::write(&real, b"12345").unwrap();

        let entries = vec![
            CacheEntry {
                name: "vanished.png".to_string(),
                path: dir.path().join("vanished.png"),
                size_bytes: 99,
                last_modified: now,
            },
            CacheEntry {
                name: "nested".to_string(),
                path: nested.clone(),
                size_bytes: 0,
                last_modified: now,
            },
            CacheEntry {
                name: "real.png".to_string(),
                path: real.clone(),
                size_bytes: 5,
                last_modified: now,
            },
        ];

        let report = sweeper.delete_entries(entries).await;
        assert_eq!(report.deleted_count, 1);
        assert_eq!(report.freed_bytes, 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, nested);
        assert!(!real.exists());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_directory_reports_failure() {
        let dir = tempdir().unwrap();
        let store = Arc::new(CacheStore::new(dir.path().join("gone")));
        let sweeper = Sweeper::new(store, ExpiryPolicy::new(EXPIRY));

        let report = sweeper.sweep().await;
        assert_eq!(report.deleted_count, 0);
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_periodic_sweep() {
        let (_dir, store, sweeper) = test_sweeper().await;
        write_expired(&store, "old.png", b"old").await;

        let handle = sweeper.spawn_periodic(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(store.stats().await.total_files, 0);
    }

    #[tokio::test]
    async fn test_zero_period_disables_timer() {
        let (_dir, store, sweeper) = test_sweeper().await;
        write_expired(&store, "old.png", b"old").await;

        let handle = sweeper.spawn_periodic(Duration::ZERO);
        handle.await.unwrap();

        assert_eq!(store.stats().await.total_files, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_period_disables_timer() {
        let (_dir, store, sweeper) = test_sweeper().await;
        write_expired(&store, "old.png", b"old").await;

        let handle = sweeper.spawn_periodic(Duration::from_secs(u64::MAX));
        handle.await.unwrap();

        assert_eq!(store.stats().await.total_files, 1);
    }
}
