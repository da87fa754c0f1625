//! HTTP server for relay endpoints
//!
//! Provides /health, /proxy/{filename}, /upload, /cache/stats and /cache/sweep.

use crate::auth::ApiKey;
use crate::error::{RelayError, Result};
use crate::proxy::ProxyCache;
use crate::types::{
    CacheStatsResponse, HealthResponse, SweepResponse, UploadRequest, UploadResponse,
};
use crate::upload::Uploader;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Base64 inflates uploads by a third
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Shared state for the HTTP server
pub struct ServerState {
    pub proxy: ProxyCache,
    pub uploader: Uploader,
    pub api_key: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(proxy: ProxyCache, uploader: Uploader, api_key: Option<String>) -> Self {
        Self {
            proxy,
            uploader,
            api_key,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/proxy/{filename}", get(get_proxy))
        .route("/upload", post(upload))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/sweep", post(sweep))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache = state.proxy.stats().await;
    let (hits, misses) = state.proxy.counters();
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache,
        hits,
        misses,
    })
}

/// Serve a file through the cache
async fn get_proxy(State(state): State<SharedState>, Path(filename): Path<String>) -> Response {
    match state.proxy.fetch_or_serve(&filename).await {
        Ok(served) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, served.content_type)
            .header(header::CACHE_CONTROL, "public, max-age=86400")
            .header("X-Cache", served.outcome.as_header())
            .body(Body::from(served.data))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            warn!(filename = %filename, error = %e, "Failed to serve file");
            e.into_response()
        }
    }
}

/// Accept a base64-encoded image and store it remotely
async fn upload(
    _key: ApiKey,
    State(state): State<SharedState>,
    Json(body): Json<UploadRequest>,
) -> Result<Json<UploadResponse>> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(body.data.trim())
        .map_err(|e| RelayError::BadRequest(format!("Invalid base64 image data: {e}")))?;

    let uploaded = state.uploader.upload(&body.filename, data).await?;

    Ok(Json(UploadResponse {
        key: uploaded.key,
        url: uploaded.url,
    }))
}

async fn cache_stats(State(state): State<SharedState>) -> Json<CacheStatsResponse> {
    let stats = state.proxy.stats().await;
    let (hits, misses) = state.proxy.counters();

    Json(CacheStatsResponse {
        total_files: stats.total_files,
        total_size_bytes: stats.total_size_bytes,
        expiry_secs: state.proxy.policy().threshold().num_seconds(),
        size_budget_bytes: state.proxy.size_budget(),
        hits,
        misses,
    })
}

/// Run one sweep of the cache on demand
async fn sweep(_key: ApiKey, State(state): State<SharedState>) -> Json<SweepResponse> {
    Json(state.proxy.sweep().await.into())
}
