//! Flat on-disk key → blob store

use crate::error::{CacheError, Result};
use crate::types::{CacheEntry, CacheStats, EntryFailure, Scan};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Longest accepted key. Leaves room for the temp-file decoration within
/// the usual 255 byte filename limit.
const MAX_KEY_LEN: usize = 200;

/// A cache directory mapping sanitized filenames to blobs.
///
/// There is no index: listing the directory is the only way to learn what
/// the cache holds.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl CacheStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Ensure the cache directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        info!(cache_dir = ?self.dir, "Cache directory ready");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check that a key names a plain file directly inside the cache directory
    pub fn validate_key(key: &str) -> Result<()> {
        let valid = !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && !key.starts_with('.')
            && !key.contains(['/', '\\', '\0']);

        if valid {
            Ok(())
        } else {
            Err(CacheError::InvalidKey(key.to_string()))
        }
    }

    /// Physical location for a key
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.dir.join(key))
    }

    /// Read the raw bytes stored under a key. Does not check expiry.
    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => CacheError::NotFound(key.to_string()),
            _ => e.into(),
        })
    }

    /// Look up the metadata of a stored entry
    pub async fn entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(to_entry(key.to_string(), path, &meta)?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a blob, replacing any previous entry for the key.
    ///
    /// Bytes land in a hidden temp file first and are renamed into place, so
    /// a concurrent reader sees either the old blob or the new one.
    pub async fn write(&self, key: &str, data: &[u8]) -> Result<CacheEntry> {
        let path = self.path_for(key)?;
        let tmp = self.temp_path(key);

        if let Err(e) = write_synced(&tmp, data).await {
            discard(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            discard(&tmp).await;
            return Err(e.into());
        }

        let meta = fs::metadata(&path).await?;
        let entry = to_entry(key.to_string(), path, &meta)?;
        debug!(key, size = entry.size_bytes, "Stored blob");
        Ok(entry)
    }

    /// Delete the entry stored under a key
    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => CacheError::NotFound(key.to_string()),
            _ => e.into(),
        })
    }

    /// List every regular file in the cache directory.
    ///
    /// Entries whose metadata cannot be read are skipped and reported in
    /// [`Scan::failures`]. If the directory itself cannot be listed the scan
    /// is empty.
    pub async fn scan(&self) -> Scan {
        let mut scan = Scan::default();

        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) => {
                let err = CacheError::Enumeration(e.to_string());
                warn!(cache_dir = ?self.dir, error = %err, "Failed to list cache directory");
                scan.failures.push(EntryFailure {
                    path: self.dir.clone(),
                    error: err.to_string(),
                });
                return scan;
            }
        };

        loop {
            let item = match dir.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    warn!(cache_dir = ?self.dir, error = %e, "Cache directory listing interrupted");
                    scan.failures.push(EntryFailure {
                        path: self.dir.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            };

            let path = item.path();
            let name = item.file_name().to_string_lossy().into_owned();
            let result = match item.metadata().await {
                Ok(meta) if !meta.is_file() => continue,
                Ok(meta) => to_entry(name, path.clone(), &meta),
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(entry) => scan.entries.push(entry),
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable cache entry");
                    scan.failures.push(EntryFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        scan
    }

    /// Count and total size of all entries, computed fresh from the directory
    pub async fn stats(&self) -> CacheStats {
        self.scan().await.stats()
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), n))
    }
}

fn to_entry(name: String, path: PathBuf, meta: &std::fs::Metadata) -> Result<CacheEntry> {
    let last_modified: DateTime<Utc> = meta.modified()?.into();
    Ok(CacheEntry {
        name,
        path,
        size_bytes: meta.len(),
        last_modified,
    })
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "Failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.init().await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let store = CacheStore::new(PathBuf::from("/cache"));

        for key in ["", ".", "..", "../secret", "a/b.png", "a\\b.png", ".hidden", "nul\0.png"] {
            assert!(
                matches!(store.path_for(key), Err(CacheError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }

        let too_long = "a".repeat(MAX_KEY_LEN + 1);
        assert!(store.path_for(&too_long).is_err());
    }

    #[test]
    fn test_path_for_is_deterministic() {
        let store = CacheStore::new(PathBuf::from("/cache"));
        assert_eq!(
            store.path_for("cat.png").unwrap(),
            PathBuf::from("/cache/cat.png")
        );
        assert_eq!(
            store.path_for("cat.png").unwrap(),
            store.path_for("cat.png").unwrap()
        );
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, store) = test_store().await;
        let data = b"\x89PNG\r\n\x1a\nnot really a png";

        let entry = store.write("a.png", data).await.unwrap();
        assert_eq!(entry.name, "a.png");
        assert_eq!(entry.size_bytes, data.len() as u64);

        let read = store.read("a.png").await.unwrap();
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_write_overwrites_wholesale() {
        let (_dir, store) = test_store().await;

        store.write("a.png", b"a much longer first version").await.unwrap();
        store.write("a.png", b"short").await.unwrap();

        assert_eq!(store.read("a.png").await.unwrap(), b"short");
        assert_eq!(store.stats().await.total_files, 1);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let (dir, store) = test_store().await;
        store.write("a.png", b"data").await.unwrap();
        store.write("b.png", b"data").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| !n.starts_with('.')));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, store) = test_store().await;
        let err = store.read("missing.png").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_entry_lookup() {
        let (_dir, store) = test_store().await;
        assert!(store.entry("a.png").await.unwrap().is_none());

        store.write("a.png", b"12345").await.unwrap();
        let entry = store.entry("a.png").await.unwrap().unwrap();
        assert_eq!(entry.size_bytes, 5);
        assert!(entry.age_at(Utc::now()) < chrono::TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_remove() {
        let (_dir, store) = test_store().await;
        store.write("a.png", b"data").await.unwrap();

        store.remove("a.png").await.unwrap();
        assert!(store.read("a.png").await.unwrap_err().is_not_found());
        assert!(store.remove("a.png").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_scan_skips_directories() {
        let (dir, store) = test_store().await;
        store.write("a.png", b"aaa").await.unwrap();
        store.write("b.jpg", b"bbbbb").await.unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let scan = store.scan().await;
        assert_eq!(scan.entries.len(), 2);
        assert!(scan.failures.is_empty());

        let stats = store.stats().await;
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size_bytes, 8);
    }

    #[tokio::test]
    async fn test_scan_of_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("does-not-exist"));

        let scan = store.scan().await;
        assert!(scan.entries.is_empty());
        assert_eq!(scan.failures.len(), 1);
        assert_eq!(store.stats().await, CacheStats::default());
    }
}
