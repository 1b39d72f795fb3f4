//! API error handling
//!
//! The admin API answers with [`ErrorResponse`] bodies. The submission
//! endpoint answers in the CiviCRM API envelope betterplace.org expects, see
//! [`SubmissionError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use domain_donation::DonationError;
use domain_profile::ProfileError;

use crate::auth::AuthError;
use crate::dto::donation::ErrorEnvelope;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    /// The CRM or settings store failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone()),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(name) => ApiError::NotFound(format!("Profile {} not found", name)),
            ProfileError::SelectorConflict { .. } | ProfileError::NameTaken(_) => {
                ApiError::Conflict(err.to_string())
            }
            ProfileError::Storage(ref source) => {
                error!(error = %source, "Profile storage failed");
                ApiError::Upstream(err.to_string())
            }
            ProfileError::UnknownAttribute(_)
            | ProfileError::InvalidValue { .. }
            | ProfileError::MissingName => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
        }
    }
}

/// Failure of the submission endpoint, rendered as a CiviCRM error envelope
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request body is not a JSON object
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// The webhook key is missing or wrong
    #[error("Invalid API key.")]
    InvalidKey,

    #[error(transparent)]
    Donation(#[from] DonationError),
}

impl SubmissionError {
    /// HTTP status for this failure
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            SubmissionError::InvalidKey => StatusCode::UNAUTHORIZED,
            SubmissionError::Donation(err) if err.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            SubmissionError::Donation(DonationError::Profile(err)) if err.is_configuration_error() => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            SubmissionError::Donation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorEnvelope::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;

    #[test]
    fn test_profile_error_status() {
        let conflict = ProfileError::SelectorConflict {
            other: "a".into(),
            form_ids: "F1".into(),
        };
        assert!(matches!(ApiError::from(conflict), ApiError::Conflict(_)));
        assert!(matches!(
            ApiError::from(ProfileError::NameTaken("b".into())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(ApiError::from(ProfileError::MissingName), ApiError::Validation(_)));
        assert!(matches!(
            ApiError::from(ProfileError::Storage(PortError::connection("down"))),
            ApiError::Upstream(_)
        ));
    }

    #[test]
    fn test_submission_error_status() {
        let unknown = SubmissionError::from(DonationError::UnknownPaymentMethod("bitcoin".into()));
        assert_eq!(unknown.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            unknown.to_string(),
            "Payment method could not be matched to existing payment instrument."
        );

        let contact = SubmissionError::from(DonationError::IndividualContact(PortError::connection("down")));
        assert_eq!(contact.status(), StatusCode::BAD_GATEWAY);

        let address = SubmissionError::from(DonationError::Address(PortError::validation("rejected")));
        assert_eq!(address.status(), StatusCode::BAD_GATEWAY);

        let storage = SubmissionError::from(DonationError::Profile(ProfileError::Storage(
            PortError::connection("down"),
        )));
        assert_eq!(storage.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(SubmissionError::InvalidKey.status(), StatusCode::UNAUTHORIZED);
    }
}
