//! Gateway authentication via API key header or bearer token

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::server::GatewayState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Validate a presented key against the configured gateway key.
///
/// Returns `true` if:
/// - No key is configured (auth disabled)
/// - The provided key matches the configured key
pub fn validate_key(configured_key: &str, provided_key: &str) -> bool {
    if configured_key.is_empty() {
        return true;
    }
    if provided_key.is_empty() {
        return false;
    }
    constant_time_eq(configured_key.as_bytes(), provided_key.as_bytes())
}

/// Extract bearer token from an Authorization header value.
///
/// Expects format: `Bearer <token>`
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Key presented by the client, `x-api-key` taking precedence over `Authorization`
pub fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        return Some(key);
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
}

pub fn check_auth(configured_key: &str, headers: &HeaderMap) -> bool {
    if configured_key.is_empty() {
        return true;
    }
    match presented_key(headers) {
        Some(key) => validate_key(configured_key, key),
        None => false,
    }
}

/// Middleware rejecting requests without a valid key
pub async fn require_api_key(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !check_auth(&state.api_key, request.headers()) {
        warn!(
            "Rejected {} {}: missing or invalid API key",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Constant-time byte comparison
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
