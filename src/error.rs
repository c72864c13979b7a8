//! Gateway-facing error taxonomy (spec.md §7) and its mapping onto engine
//! and identity-store errors.

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::engine::EngineError;
use crate::identity::IdentityError;
use crate::sanitizer::RejectReason;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthenticated,
    Forbidden(String),
    Conflict(String),
    Precondition(String),
    RateLimited { limit: u32, retry_after_secs: u64 },
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // `RateLimited` carries its own headers (`Retry-After` plus the same
        // `X-RateLimit-*` triad a successful response gets), so it's handled
        // separately from the rest of the plain status+body variants.
        if let ApiError::RateLimited { limit, retry_after_secs } = self {
            let mut headers = HeaderMap::new();
            headers.insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
            headers.insert("x-ratelimit-reset", HeaderValue::from(retry_after_secs));
            let body = ErrorBody {
                error: "rate limit exceeded".to_string(),
                retry_after: Some(retry_after_secs),
            };
            return (StatusCode::TOO_MANY_REQUESTS, headers, axum::Json(body)).into_response();
        }

        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "missing or invalid bearer token".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Precondition(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::RateLimited { .. } => unreachable!("handled above"),
        };
        let body = ErrorBody {
            error: message,
            retry_after: None,
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotYourTurn
            | EngineError::WrongPhase
            | EngineError::BetToMatch
            | EngineError::BelowMinRaise
            | EngineError::InsufficientChips
            | EngineError::InHandCannotLeave
            | EngineError::InvalidSitRequest
            | EngineError::NotEnoughPlayers
            | EngineError::InvalidAction => ApiError::Precondition(err.to_string()),
            EngineError::TableFull
            | EngineError::AlreadySeated
            | EngineError::InsufficientBuyIn
            | EngineError::NotSeated
            | EngineError::Deck(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NameTaken => ApiError::Conflict(err.to_string()),
            IdentityError::UnknownAgent => ApiError::Unauthenticated,
            IdentityError::Banned => ApiError::Forbidden(err.to_string()),
            IdentityError::NoRebuysLeft | IdentityError::RebuyNotEligible => {
                ApiError::Precondition(err.to_string())
            }
        }
    }
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        let message = match reason {
            RejectReason::TooShort => "name too short",
            RejectReason::TooLong => "message too long",
            RejectReason::Empty => "message empty after cleaning",
            RejectReason::Filtered => "Message filtered",
        };
        ApiError::Validation(message.to_string())
    }
}
