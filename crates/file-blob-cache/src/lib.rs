//! Directory-backed blob cache with age-based expiry
//!
//! The cache directory is the only source of truth: every entry is a plain
//! file named after its key, and entry metadata is read back from the
//! filesystem on demand. Entries expire once their modification time is
//! older than the configured threshold and are reclaimed by a [`Sweeper`].

mod error;
mod expiry;
mod store;
mod sweeper;
mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use error::{CacheError, Result};
pub use expiry::ExpiryPolicy;
pub use store::CacheStore;
pub use sweeper::{SweepReport, Sweeper};
pub use types::{CacheConfig, CacheEntry, CacheStats, EntryFailure, Scan};
