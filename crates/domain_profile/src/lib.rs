//! Profile Domain
//!
//! A profile decides how a donation submitted through a betterplace.org form
//! is recorded in CiviCRM: which financial type and campaign the contribution
//! gets, which payment instrument each payment method maps to, and which
//! newsletter groups opted-in donors join.
//!
//! # Selection
//!
//! Each profile carries a selector, a comma-separated list of betterplace.org
//! form ids. An incoming submission is handled by the first profile whose
//! selector contains its form id; the `default` profile catches everything
//! else and always exists.
//!
//! # Examples
//!
//! ```rust
//! use domain_profile::{Profile, ProfileAttribute};
//! use serde_json::json;
//!
//! let mut profile = Profile::factory_default("campaign-x");
//! profile.set_attribute(ProfileAttribute::Selector, &json!("F1,F2")).unwrap();
//!
//! assert!(profile.matches("F2"));
//! assert!(!profile.matches("F3"));
//! assert!(profile.payment_instrument("paypal").is_some());
//! assert!(profile.payment_instrument("bitcoin").is_none());
//!
//! // The attribute set is closed.
//! assert!(profile.set_attribute_str("colour", &json!("red")).is_err());
//! ```

pub mod profile;
pub mod error;
pub mod validation;
pub mod ports;
pub mod registry;
pub mod form;

pub use profile::{Profile, ProfileAttribute, Selector, StoredProfiles, DEFAULT_PROFILE_NAME};
pub use error::ProfileError;
pub use validation::{ProfileValidator, SaveMode};
pub use ports::{SettingsPort, ReferenceDataPort, OptionItem, PROFILES_SETTING};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemorySettingsStore, StaticReferenceData};
pub use registry::ProfileRegistry;
pub use form::{ProfileForm, FormDefinition, FormField, FieldKind};
