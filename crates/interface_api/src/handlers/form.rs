//! Profile editor handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::{Map, Value};
use validator::Validate;

use domain_profile::{FormDefinition, ProfileForm};

use crate::auth::{permissions, require_role, Claims};
use crate::dto::profile::{ProfileFormQuery, ProfileResponse};
use crate::{error::ApiError, AppState};

/// Describes the editor for a profile, with the CRM's options filled in
pub async fn get_form(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProfileFormQuery>,
) -> Result<Json<FormDefinition>, ApiError> {
    require_role(&claims, permissions::PROFILE_READ)?;
    query.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let form = ProfileForm::open(&state.registry, query.name.as_deref(), query.is_new()).await?;
    let definition = form.build(state.reference_data.as_ref()).await?;
    Ok(Json(definition))
}

/// Saves the editor's values
pub async fn submit_form(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProfileFormQuery>,
    Json(values): Json<Map<String, Value>>,
) -> Result<Json<ProfileResponse>, ApiError> {
    require_role(&claims, permissions::PROFILE_WRITE)?;
    query.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let form = ProfileForm::open(&state.registry, query.name.as_deref(), query.is_new()).await?;
    let profile = form.submit(&values).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}
