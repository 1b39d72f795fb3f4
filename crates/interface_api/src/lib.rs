//! HTTP API Layer
//!
//! This crate exposes the bridge over HTTP using Axum.
//!
//! # Architecture
//!
//! - **Submission endpoint**: `POST /api/v3/bp-donation/submit`, called by
//!   betterplace.org and answered in the CiviCRM API envelope
//! - **Admin API**: profile listing, deletion and the profile editor under
//!   `/api/v1`, protected by JWT bearer tokens
//! - **Middleware**: authentication, webhook key check, tracing, audit logging
//! - **Error Handling**: consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(config, registry, handler, reference_data);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_donation::SubmissionHandler;
use domain_profile::{ProfileRegistry, ReferenceDataPort};

use crate::config::ApiConfig;
use crate::handlers::{donation, form, health, profiles};
use crate::middleware::{audit_middleware, auth_middleware, webhook_key_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<ProfileRegistry>,
    pub submissions: Arc<SubmissionHandler>,
    pub reference_data: Arc<dyn ReferenceDataPort>,
    /// Adapters asked by the readiness check
    pub health_checks: Vec<Arc<dyn HealthCheckable>>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        registry: Arc<ProfileRegistry>,
        submissions: Arc<SubmissionHandler>,
        reference_data: Arc<dyn ReferenceDataPort>,
    ) -> Self {
        Self {
            config,
            registry,
            submissions,
            reference_data,
            health_checks: Vec::new(),
        }
    }

    /// Registers an adapter with the readiness check
    pub fn with_health_check(mut self, adapter: Arc<dyn HealthCheckable>) -> Self {
        self.health_checks.push(adapter);
        self
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    // Called by betterplace.org
    let submission_routes = Router::new()
        .route("/bp-donation/submit", post(donation::submit_donation))
        .layer(axum_middleware::from_fn_with_state(state.clone(), webhook_key_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware));

    let profile_routes = Router::new()
        .route("/", get(profiles::list_profiles))
        .route("/:name", get(profiles::get_profile).delete(profiles::delete_profile));

    // Protected admin routes
    let admin_routes = Router::new()
        .nest("/profiles", profile_routes)
        .route("/profile-form", get(form::get_form).post(form::submit_form))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v3", submission_routes)
        .nest("/api/v1", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
