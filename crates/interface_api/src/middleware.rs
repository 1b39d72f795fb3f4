//! API middleware

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::OperationMetadata;

use crate::auth::Claims;
use crate::error::SubmissionError;
use crate::AppState;

/// Header carrying the correlation id of a request
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Header carrying the webhook key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter carrying the webhook key
pub const API_KEY_QUERY_PARAM: &str = "api_key";

/// Authentication middleware
///
/// Validates JWT tokens and extracts user claims
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let Some(token) = token else {
        warn!("Missing or invalid Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match crate::auth::validate_token(token, &state.config.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            warn!("Token validation failed: {:?}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Webhook key middleware for the submission endpoint
///
/// Accepts the key from the `X-Api-Key` header or the percent-decoded
/// `api_key` query parameter. Without a configured key every request passes.
pub async fn webhook_key_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.webhook_key.as_deref() else {
        return next.run(request).await;
    };

    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let query_key = || {
        Query::<HashMap<String, String>>::try_from_uri(request.uri())
            .ok()
            .and_then(|Query(mut params)| params.remove(API_KEY_QUERY_PARAM))
    };

    match header_key.or_else(query_key) {
        Some(key) if keys_match(&key, expected) => next.run(request).await,
        _ => {
            warn!(uri = %request.uri().path(), "Rejected submission with invalid webhook key");
            SubmissionError::InvalidKey.into_response()
        }
    }
}

/// Compares webhook keys in constant time
fn keys_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Audit logging middleware
///
/// Assigns every request a correlation id, hands it to the handlers as
/// [`OperationMetadata`] and logs the outcome.
pub async fn audit_middleware(
    State(_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_id = request
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    let metadata = OperationMetadata::with_correlation_id(correlation_id.clone())
        .from_source("interface_api");
    request.extensions_mut().insert(OperationMetadata {
        initiated_by: Some(user_id.clone()),
        ..metadata
    });

    let start = Utc::now();

    let mut response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        correlation_id = %correlation_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cr/t+k", "s3cr/t+k"));
        assert!(!keys_match("s3cr/t+", "s3cr/t+k"));
        assert!(!keys_match("", "s3cr/t+k"));
    }
}
