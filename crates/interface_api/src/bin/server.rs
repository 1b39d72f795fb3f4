//! betterplace.org bridge - API Server Binary
//!
//! Starts the HTTP server receiving betterplace.org donations and serving
//! the profile admin API.
//!
//! # Usage
//!
//! ```bash
//! # Run with config/bridge.toml and defaults
//! cargo run --bin betterplace-bridge
//!
//! # Run with environment variables
//! BRIDGE_PORT=8080 BRIDGE_CIVICRM__BASE_URL=https://crm.example.org/civicrm/ajax/rest \
//!     BRIDGE_CIVICRM__API_KEY=... BRIDGE_CIVICRM__SITE_KEY=... cargo run --bin betterplace-bridge
//! ```
//!
//! # Environment Variables
//!
//! * `BRIDGE_HOST` / `BRIDGE_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `BRIDGE_JWT_SECRET` - JWT signing secret for the admin API
//! * `BRIDGE_WEBHOOK_KEY` - Key betterplace.org must send with submissions
//! * `BRIDGE_CIVICRM__BASE_URL`, `BRIDGE_CIVICRM__API_KEY`, `BRIDGE_CIVICRM__SITE_KEY`
//! * `BRIDGE_SETTINGS_BACKEND` - `civicrm`, `postgres` or `memory` (default: civicrm)
//! * `BRIDGE_DATABASE__URL` - PostgreSQL connection string for the postgres backend
//! * `BRIDGE_CURRENCY` / `BRIDGE_TIMEZONE` - Defaults: EUR, Europe/Berlin
//! * `BRIDGE_LOG_LEVEL` / `BRIDGE_LOG_FORMAT` - Defaults: info, text

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::HealthCheckable;
use domain_donation::{CiviCrmAdapter, SubmissionHandler};
use domain_profile::{ProfileRegistry, SettingsPort};
use infra_db::{create_pool, run_migrations, PgSettingsStore};
use interface_api::config::{ApiConfig, LogFormat, SettingsBackend};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        settings_backend = ?config.settings_backend,
        "Starting betterplace.org bridge"
    );

    let crm = Arc::new(
        CiviCrmAdapter::new(config.civicrm_config()).context("Invalid CiviCRM configuration")?,
    );

    let mut health_checks: Vec<Arc<dyn HealthCheckable>> = Vec::new();
    health_checks.push(crm.clone());
    let settings: Arc<dyn SettingsPort> = match config.settings_backend {
        SettingsBackend::Civicrm => crm.clone(),
        SettingsBackend::Postgres => {
            let pool = create_pool(config.database.clone()).await?;
            run_migrations(&pool).await?;
            let store = Arc::new(PgSettingsStore::new(pool));
            health_checks.push(store.clone());
            store
        }
        SettingsBackend::Memory => memory_settings()?,
    };

    let registry = Arc::new(ProfileRegistry::new(settings));
    let submissions = Arc::new(SubmissionHandler::new(
        registry.clone(),
        crm.clone(),
        config.handler_options(),
    ));

    let mut state = AppState::new(config.clone(), registry, submissions, crm);
    for adapter in health_checks {
        state = state.with_health_check(adapter);
    }
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("Invalid listen address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "mock")]
fn memory_settings() -> anyhow::Result<Arc<dyn SettingsPort>> {
    tracing::warn!("Profiles are kept in memory and lost on restart");
    Ok(Arc::new(domain_profile::InMemorySettingsStore::new()))
}

#[cfg(not(feature = "mock"))]
fn memory_settings() -> anyhow::Result<Arc<dyn SettingsPort>> {
    anyhow::bail!("the memory settings backend requires the `mock` feature")
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
