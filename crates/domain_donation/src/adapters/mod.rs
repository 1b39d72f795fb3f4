//! External Adapters for the Donation Domain
//!
//! - **CiviCrmAdapter**: CiviCRM APIv3 over REST. Implements `CrmPort` as
//!   well as the profile domain's `ReferenceDataPort` and `SettingsPort`.
//! - **MockCrmPort**: recording in-memory CRM for tests (see `ports::mock`)
//!
//! ```rust,ignore
//! use domain_donation::adapters::{CiviCrmAdapter, CiviCrmConfig};
//! use domain_donation::CrmPort;
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(CiviCrmAdapter::new(CiviCrmConfig {
//!     base_url: "https://crm.example.org/civicrm/ajax/rest".to_string(),
//!     api_key: "user-key".to_string(),
//!     site_key: "site-key".to_string(),
//!     ..Default::default()
//! })?);
//! let crm: Arc<dyn CrmPort> = adapter.clone();
//! ```

pub mod civicrm;

pub use civicrm::{CiviCrmAdapter, CiviCrmConfig};
