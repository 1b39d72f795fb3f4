//! API configuration
//!
//! Values come from an optional `config/bridge.toml` overlaid with `BRIDGE_*`
//! environment variables. Nested sections use a double underscore, e.g.
//! `BRIDGE_CIVICRM__BASE_URL`.

use serde::Deserialize;

use core_kernel::{Currency, Timezone};
use domain_donation::{CiviCrmConfig, HandlerOptions};
use infra_db::DatabaseConfig;

/// Shipped JWT secret; the server refuses to start with it
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Where the profile collection is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsBackend {
    /// The CiviCRM settings entry
    #[default]
    Civicrm,
    /// The `settings` table of a PostgreSQL database
    Postgres,
    /// Process memory, lost on restart
    Memory,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Connection settings for the CiviCRM REST API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CiviCrmSection {
    pub base_url: String,
    pub api_key: String,
    pub site_key: String,
    pub timeout_secs: u64,
}

impl Default for CiviCrmSection {
    fn default() -> Self {
        let defaults = CiviCrmConfig::default();
        Self {
            base_url: "http://localhost/civicrm/ajax/rest".to_string(),
            api_key: defaults.api_key,
            site_key: defaults.site_key,
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for the admin API
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Shared key betterplace.org sends with each submission; unset disables the check
    pub webhook_key: Option<String>,
    pub civicrm: CiviCrmSection,
    pub settings_backend: SettingsBackend,
    /// Connection pool for the postgres settings backend
    pub database: DatabaseConfig,
    /// Currency of submitted amounts
    pub currency: Currency,
    /// Time zone of the CiviCRM site
    pub timezone: Timezone,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            jwt_expiration_secs: 3600,
            webhook_key: None,
            civicrm: CiviCrmSection::default(),
            settings_backend: SettingsBackend::default(),
            database: DatabaseConfig::default(),
            currency: Currency::default(),
            timezone: Timezone::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `config/bridge.toml` and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config/bridge")
    }

    /// Loads configuration from the given file (extension optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("BRIDGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Rejects settings the server must not run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.jwt_secret.trim().is_empty() || self.jwt_secret == PLACEHOLDER_JWT_SECRET {
            return Err(config::ConfigError::Message(
                "jwt_secret must be set (BRIDGE_JWT_SECRET)".to_string(),
            ));
        }
        if matches!(self.webhook_key.as_deref(), Some(key) if key.is_empty()) {
            return Err(config::ConfigError::Message(
                "webhook_key must not be empty; leave it unset to disable the check".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Adapter configuration for the CiviCRM REST API
    pub fn civicrm_config(&self) -> CiviCrmConfig {
        CiviCrmConfig {
            base_url: self.civicrm.base_url.clone(),
            api_key: self.civicrm.api_key.clone(),
            site_key: self.civicrm.site_key.clone(),
            timeout_secs: self.civicrm.timeout_secs,
            ..CiviCrmConfig::default()
        }
    }

    /// Options applied to every submission
    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions {
            currency: self.currency,
            timezone: self.timezone,
        }
    }
}
