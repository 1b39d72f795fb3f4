//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the bridge's settings. Deployments that do not keep
//! the profile collection inside CiviCRM store it here instead, in a single
//! key/value `settings` table.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgSettingsStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/bridge")).await?;
//! run_migrations(&pool).await?;
//! let settings = PgSettingsStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;

pub use adapters::PgSettingsStore;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
