//! Cache types

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Expiry and sizing parameters, fixed for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries at least this old are expired
    pub expiry: Duration,
    /// Aggregate size above which a write triggers a sweep
    pub size_budget: u64,
    /// Period of the background sweep
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(90 * 24 * 60 * 60), // ~3 months
            size_budget: 1024 * 1024 * 1024,                // 1GB
            sweep_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// A cached blob as seen through its file metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry at `now`. A modification time in the future
    /// (clock rollback) counts as zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> TimeDelta {
        let age = now - self.last_modified;
        if age < TimeDelta::zero() {
            TimeDelta::zero()
        } else {
            age
        }
    }
}

/// Aggregate snapshot of the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
}

/// A single entry that could not be inspected or removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of enumerating the cache directory. Enumeration is best-effort,
/// so entries that could not be read are reported next to the ones that could.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub entries: Vec<CacheEntry>,
    pub failures: Vec<EntryFailure>,
}

impl Scan {
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_files: self.entries.len(),
            total_size_bytes: self.entries.iter().map(|e| e.size_bytes).sum(),
        }
    }
}
