//! PostgreSQL Settings Adapter
//!
//! Keeps the profile collection as one JSONB document in the `settings`
//! table, under the same key the CiviCRM settings entry uses.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_profile::{SettingsPort, StoredProfiles, PROFILES_SETTING};

use crate::error::DatabaseError;

/// PostgreSQL-backed implementation of the `SettingsPort` trait
///
/// Every store rewrites the whole document in a single upsert, so readers
/// always see either the previous or the new collection.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
    key: String,
}

impl PgSettingsStore {
    /// Creates a store for the profile collection
    pub fn new(pool: PgPool) -> Self {
        Self::with_key(pool, PROFILES_SETTING)
    }

    /// Creates a store reading and writing a different settings key
    pub fn with_key(pool: PgPool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    /// The settings key this store uses
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<Option<Value>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Value>>("SELECT value FROM settings WHERE key = $1")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(value)| value))
    }

    async fn upsert(&self, value: &Value) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&self.key)
        .bind(Json(value))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl DomainPort for PgSettingsStore {}

#[async_trait]
impl HealthCheckable for PgSettingsStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult::now("postgres-settings", AdapterHealth::Healthy, latency_ms, None),
            Err(e) => HealthCheckResult::now(
                "postgres-settings",
                AdapterHealth::Unhealthy,
                latency_ms,
                Some(format!("Database error: {}", e)),
            ),
        }
    }
}

#[async_trait]
impl SettingsPort for PgSettingsStore {
    #[instrument(skip(self), fields(key = %self.key))]
    async fn load_profiles(&self) -> Result<Option<StoredProfiles>, PortError> {
        let stored = self.fetch().await?;
        debug!(found = stored.is_some(), "Loaded settings");
        stored.map(into_profiles).transpose()
    }

    #[instrument(skip(self, profiles), fields(key = %self.key, count = profiles.len()))]
    async fn store_profiles(&self, profiles: &StoredProfiles) -> Result<(), PortError> {
        let value = serde_json::to_value(profiles)
            .map_err(|e| PortError::from(DatabaseError::SerializationError(e.to_string())))?;
        self.upsert(&value).await?;
        Ok(())
    }
}

/// Splits a stored document into the per-profile entries
///
/// A JSON `null` counts as "nothing stored".
fn into_profiles(value: Value) -> Result<StoredProfiles, PortError> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(StoredProfiles::new()),
        other => Err(PortError::transformation(format!(
            "{} is not a profile map: {}",
            PROFILES_SETTING, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_profiles_keeps_entries() {
        let profiles = into_profiles(json!({
            "default": {"selector": ""},
            "campaign-x": {"selector": "F1"}
        }))
        .unwrap();
        assert_eq!(
            profiles.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["campaign-x", "default"]
        );
        assert_eq!(profiles["campaign-x"]["selector"], "F1");
    }

    #[test]
    fn test_into_profiles_rejects_non_objects() {
        let err = into_profiles(json!(["default"])).unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[test]
    fn test_into_profiles_null_is_empty() {
        assert!(into_profiles(Value::Null).unwrap().is_empty());
    }
}
