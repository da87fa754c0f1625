//! Request and response bodies for the relay's HTTP API

use file_blob_cache::{CacheStats, SweepReport};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    /// base64
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub expiry_secs: i64,
    pub size_budget_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Sweep outcome without the per-file failure details
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub deleted_count: usize,
    pub freed_bytes: u64,
    pub failed_count: usize,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            deleted_count: report.deleted_count,
            freed_bytes: report.freed_bytes,
            failed_count: report.failures.len(),
        }
    }
}
