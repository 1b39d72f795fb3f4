//! Profile handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::{permissions, require_role, Claims};
use crate::dto::profile::ProfileResponse;
use crate::{error::ApiError, AppState};

/// Lists all profiles in name order
pub async fn list_profiles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ProfileResponse>>, ApiError> {
    require_role(&claims, permissions::PROFILE_READ)?;
    let profiles = state.registry.profiles().await?;
    Ok(Json(profiles.values().map(ProfileResponse::from).collect()))
}

/// Gets a profile by name
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    require_role(&claims, permissions::PROFILE_READ)?;
    let profile = state
        .registry
        .profile(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Profile {} not found", name)))?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// Deletes a profile
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_role(&claims, permissions::PROFILE_WRITE)?;
    if state.registry.delete(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Profile {} not found", name)))
    }
}
