//! Image Relay - upload relay and caching proxy
//!
//! Accepts image uploads, commits them to a GitHub repository, and serves
//! repository files through a local disk cache with age-based expiry.

mod auth;
mod compress;
mod config;
mod error;
mod proxy;
mod server;
mod types;
mod upload;

use crate::compress::Compressor;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::proxy::ProxyCache;
use crate::server::{start_server, ServerState, SharedState};
use crate::upload::Uploader;
use file_blob_cache::CacheStore;
use github_content_store::{GithubContentStore, RemoteStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("image_relay=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting Image Relay...");

    let config = RelayConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Upload dir: {:?}", config.upload_dir);
    info!(
        "Max cache size: {} MB",
        config.cache.size_budget / (1024 * 1024)
    );
    info!("Cache expiry: {} seconds", config.cache.expiry.as_secs());
    info!(
        "Sweep interval: {} seconds",
        config.cache.sweep_interval.as_secs()
    );
    info!(
        "Remote store: {}/{}@{}",
        config.github.owner, config.github.repo, config.github.branch
    );

    if config.api_key.is_none() {
        warn!("API_KEY is not set, uploads are not authenticated");
    }
    if config.github.token.is_none() {
        warn!("GITHUB_TOKEN is not set, uploads will be rejected by GitHub");
    }

    let cache = Arc::new(CacheStore::new(config.cache_dir.clone()));
    cache.init().await?;
    let staging = Arc::new(CacheStore::new(config.upload_dir.clone()));
    staging.init().await?;

    let remote: Arc<dyn RemoteStore> = Arc::new(
        GithubContentStore::new(config.github.clone())
            .map_err(|e| RelayError::Config(format!("GitHub client: {}", e)))?,
    );

    let compressor = Compressor::new(config.compress_command.clone());
    if compressor.is_enabled() {
        info!("Compression command: {:?}", config.compress_command);
    }

    let proxy = ProxyCache::new(cache, &config.cache, remote.clone());
    let uploader = Uploader::new(
        staging,
        compressor,
        remote,
        config.public_url.clone(),
    );

    // Sweep once at startup, then on a timer
    let report = proxy.sweep().await;
    info!(
        deleted = report.deleted_count,
        freed_bytes = report.freed_bytes,
        "Startup sweep complete"
    );
    let staging_sweeper = uploader.staging_sweeper();
    let report = staging_sweeper.sweep().await;
    info!(
        deleted = report.deleted_count,
        freed_bytes = report.freed_bytes,
        "Startup staging sweep complete"
    );

    proxy
        .sweeper()
        .clone()
        .spawn_periodic(config.cache.sweep_interval);
    staging_sweeper.spawn_periodic(config.cache.sweep_interval);

    let state: SharedState = Arc::new(ServerState::new(proxy, uploader, config.api_key.clone()));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| RelayError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
