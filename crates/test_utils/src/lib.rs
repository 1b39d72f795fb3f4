//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! betterplace.org bridge test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built submissions, profiles and ids
//! - `builders`: Builder patterns for test data construction
//! - `database`: PostgreSQL test container management
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
