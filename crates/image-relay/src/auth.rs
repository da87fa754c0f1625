use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;

use crate::error::RelayError;
use crate::server::SharedState;

/// Marker for requests that presented the configured API key.
///
/// Use this as a handler parameter to protect a route:
///
/// ```ignore
/// async fn my_handler(_key: ApiKey, ...) -> Result<..., RelayError> { ... }
/// ```
///
/// With no `API_KEY` configured every request passes.
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<SharedState> for ApiKey {
    type Rejection = RelayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_key.as_deref() else {
            return Ok(ApiKey);
        };

        match presented_key(parts) {
            Some(key) if key == expected => Ok(ApiKey),
            _ => Err(RelayError::Unauthorized),
        }
    }
}

/// Key from `Authorization: Bearer <key>` or `X-API-Key: <key>`
fn presented_key(parts: &Parts) -> Option<&str> {
    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    bearer.or_else(|| {
        parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
    })
}
