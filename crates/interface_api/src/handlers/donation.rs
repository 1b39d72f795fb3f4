//! Submission endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;
use tracing::{info, warn};

use core_kernel::OperationMetadata;
use domain_donation::{DonationError, Submission};

use crate::dto::donation::SuccessEnvelope;
use crate::error::SubmissionError;
use crate::AppState;

/// Records one betterplace.org donation
///
/// The body carries the submission parameters. Values may arrive as strings,
/// the way the CiviCRM API receives them.
pub async fn submit_donation(
    State(state): State<AppState>,
    metadata: Option<Extension<OperationMetadata>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessEnvelope>, SubmissionError> {
    let Json(body) = body.map_err(|rejection| SubmissionError::MalformedBody(rejection.body_text()))?;
    if !body.is_object() {
        return Err(SubmissionError::MalformedBody("expected a JSON object".to_string()));
    }

    let submission: Submission = serde_json::from_value(body)
        .map_err(|e| DonationError::validation(e.to_string()))?;

    let metadata = metadata.map(|Extension(metadata)| metadata);
    match state.submissions.submit(submission, metadata).await {
        Ok(receipt) => {
            info!(foreign_id = receipt.foreign_id, "Submission accepted");
            Ok(Json(SuccessEnvelope::from(receipt)))
        }
        Err(error) => {
            warn!(%error, "Submission rejected");
            Err(error.into())
        }
    }
}
