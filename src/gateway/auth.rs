//! Bearer-token authentication and rate-limit enforcement, grounded on
//! `api/auth.rs::{enforce_rate_limit, validate_signed_request}` — the
//! wallet-signature verification is replaced by a bearer-token lookup
//! against the identity store's `apiKeyHash` index (see DESIGN.md).

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderValue};

use crate::error::ApiError;
use crate::identity::Agent;
use crate::ratelimit::{Decision, RouteClass};

use super::AppState;

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)
}

/// Authenticates the bearer token and rejects banned/unknown agents.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Agent, ApiError> {
    let token = extract_bearer(headers)?;
    state.identity.authenticate(token).map_err(Into::into)
}

/// Consults the per-route-class sliding window, keyed by agent id for
/// authenticated/chat classes and by source IP for register/public ones.
/// Returns the [`Decision`] on success so the caller can attach the
/// `X-RateLimit-*` headers spec.md §6 requires on every response.
pub fn enforce_rate_limit(state: &AppState, class: RouteClass, key: &str) -> Result<Decision, ApiError> {
    let decision = state.rate_limiter.check(class, key, now_secs());
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            limit: decision.limit,
            retry_after_secs: decision.retry_after_secs.unwrap_or(60),
        });
    }
    Ok(decision)
}

/// Builds the `X-RateLimit-Limit`/`X-RateLimit-Remaining`/`X-RateLimit-Reset`
/// headers spec.md §6 says every response carries.
pub fn rate_limit_headers(decision: &Decision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_in_secs));
    headers
}
