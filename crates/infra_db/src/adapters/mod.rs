//! Domain Adapters
//!
//! Implementations of the domain ports backed by PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PgSettingsStore;
//! use domain_profile::ProfileRegistry;
//!
//! let registry = ProfileRegistry::new(Arc::new(PgSettingsStore::new(pool)));
//! ```

pub mod settings;

pub use settings::PgSettingsStore;
