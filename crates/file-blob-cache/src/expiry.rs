//! Age-based validity of cache entries

use crate::store::CacheStore;
use crate::types::{CacheEntry, Scan};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Classifies entries as valid or expired by their age.
///
/// Ages are measured against the wall clock. If the clock moves backwards,
/// entries may stay valid longer than intended; this is not corrected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    threshold: TimeDelta,
}

impl ExpiryPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// An entry is valid while strictly younger than the threshold
    pub fn is_valid_at(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.age_at(now) < self.threshold
    }

    pub fn is_valid(&self, entry: &CacheEntry) -> bool {
        self.is_valid_at(entry, Utc::now())
    }

    /// Scan the store and keep only expired entries. Enumeration failures
    /// are passed through untouched.
    pub async fn list_expired(&self, store: &CacheStore) -> Scan {
        let mut scan = store.scan().await;
        let now = Utc::now();
        scan.entries.retain(|entry| !self.is_valid_at(entry, now));
        scan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::backdate;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn entry_aged(now: DateTime<Utc>, age: TimeDelta) -> CacheEntry {
        CacheEntry {
            name: "a.png".to_string(),
            path: PathBuf::from("/cache/a.png"),
            size_bytes: 100,
            last_modified: now - age,
        }
    }

    #[test]
    fn test_young_entry_is_valid() {
        let policy = ExpiryPolicy::new(HOUR);
        let now = Utc::now();

        assert!(policy.is_valid_at(&entry_aged(now, TimeDelta::zero()), now));
        assert!(policy.is_valid_at(&entry_aged(now, TimeDelta::seconds(3599)), now));
    }

    #[test]
    fn test_threshold_boundary_is_expired() {
        let policy = ExpiryPolicy::new(HOUR);
        let now = Utc::now();

        assert!(!policy.is_valid_at(&entry_aged(now, TimeDelta::seconds(3600)), now));
        assert!(!policy.is_valid_at(&entry_aged(now, TimeDelta::seconds(3601)), now));
    }

    #[test]
    fn test_future_timestamp_stays_valid() {
        let policy = ExpiryPolicy::new(HOUR);
        let now = Utc::now();
        let entry = entry_aged(now, TimeDelta::seconds(-86_400));

        assert!(policy.is_valid_at(&entry, now));
    }

    #[test]
    fn test_zero_threshold_expires_everything() {
        let policy = ExpiryPolicy::new(Duration::ZERO);
        let now = Utc::now();
        assert!(!policy.is_valid_at(&entry_aged(now, TimeDelta::zero()), now));
    }

    #[tokio::test]
    async fn test_list_expired() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.init().await.unwrap();
        let policy = ExpiryPolicy::new(HOUR);

        store.write("fresh.png", b"fresh").await.unwrap();
        let stale = store.write("stale.png", b"stale").await.unwrap();
        backdate(&stale.path, HOUR + Duration::from_secs(1));

        let expired = policy.list_expired(&store).await;
        assert!(expired.failures.is_empty());
        assert_eq!(expired.entries.len(), 1);
        assert_eq!(expired.entries[0].name, "stale.png");
    }

    #[tokio::test]
    async fn test_list_expired_tolerates_missing_directory() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("gone"));
        let policy = ExpiryPolicy::new(HOUR);

        let expired = policy.list_expired(&store).await;
        assert!(expired.entries.is_empty());
        assert_eq!(expired.failures.len(), 1);
    }
}
