//! Upload pipeline: stage, compress, push to the remote store, clean up

use crate::compress::Compressor;
use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use file_blob_cache::{CacheStore, ExpiryPolicy, Sweeper};
use github_content_store::RemoteStore;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Staged files older than this are leftovers from failed uploads
pub const STAGING_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub key: String,
    pub url: String,
}

pub struct Uploader {
    staging: Arc<CacheStore>,
    compressor: Compressor,
    remote: Arc<dyn RemoteStore>,
    public_url: Option<String>,
}

impl Uploader {
    pub fn new(
        staging: Arc<CacheStore>,
        compressor: Compressor,
        remote: Arc<dyn RemoteStore>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            staging,
            compressor,
            remote,
            public_url,
        }
    }

    /// Sweeper for files stranded in the staging directory
    pub fn staging_sweeper(&self) -> Sweeper {
        Sweeper::new(self.staging.clone(), ExpiryPolicy::new(STAGING_EXPIRY))
    }

    /// Store an uploaded image remotely and return where it can be fetched.
    ///
    /// The staged copy is removed only once the remote upload succeeded;
    /// otherwise it is left for the staging sweeper.
    pub async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<Uploaded> {
        if data.is_empty() {
            return Err(RelayError::BadRequest("Empty upload".to_string()));
        }

        let key = upload_key(filename, &data, Utc::now());
        let staged = self.staging.write(&key, &data).await?;

        let body = self.compressor.compress(&staged.path, data).await;
        let remote_url = self
            .remote
            .upload(&key, &body)
            .await
            .map_err(RelayError::Upload)?;

        if let Err(e) = self.staging.remove(&key).await {
            warn!(key = %key, error = %e, "Failed to remove staged upload");
        }

        let url = match &self.public_url {
            Some(base) => format!("{}/proxy/{}", base, key),
            None => remote_url,
        };

        info!(key = %key, size = body.len(), "Uploaded image");
        Ok(Uploaded { key, url })
    }
}

/// Key for a new upload: `{unix millis}-{content hash prefix}.{ext}`
pub fn upload_key(filename: &str, data: &[u8], now: DateTime<Utc>) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!(
        "{}-{}.{}",
        now.timestamp_millis(),
        &digest[..12],
        extension(filename)
    )
}

fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}
