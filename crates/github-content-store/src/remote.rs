//! Abstraction over the remote object store

use crate::error::Result;
use async_trait::async_trait;

/// A remote key → blob store.
///
/// The relay only ever needs these two operations, so tests can swap in an
/// in-memory implementation.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `data` under `key` and return a public URL for it
    async fn upload(&self, key: &str, data: &[u8]) -> Result<String>;
}
