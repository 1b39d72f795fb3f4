//! Profile Domain Ports
//!
//! The profile domain needs two things from the outside world: somewhere to
//! keep the profile collection, and the CRM's reference data to offer in the
//! profile editor.
//!
//! - [`SettingsPort`] loads and stores the whole collection as one settings
//!   entry. There are no partial updates; every mutation rewrites the entry.
//! - [`ReferenceDataPort`] lists the active location types, financial types,
//!   campaigns, payment instruments and mailing-list groups.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_profile::{ProfileRegistry, SettingsPort};
//! use std::sync::Arc;
//!
//! let settings: Arc<dyn SettingsPort> = Arc::new(CiviCrmAdapter::new(config)?);
//! let registry = ProfileRegistry::new(settings);
//! let profile = registry.profile_for_form("12345").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_kernel::{DomainPort, PortError};

use crate::profile::StoredProfiles;

/// Name of the settings entry holding the profile collection
pub const PROFILES_SETTING: &str = "betterplace_profiles";

/// One entry of a select list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Submitted value (usually a CRM id)
    pub value: String,
    /// Human readable label
    pub label: String,
}

impl OptionItem {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Persistence for the profile collection
#[async_trait]
pub trait SettingsPort: DomainPort {
    /// Reads the stored collection
    ///
    /// # Returns
    ///
    /// `None` if nothing has been stored yet
    async fn load_profiles(&self) -> Result<Option<StoredProfiles>, PortError>;

    /// Replaces the stored collection
    async fn store_profiles(&self, profiles: &StoredProfiles) -> Result<(), PortError>;
}

/// Reference data offered as options in the profile editor
#[async_trait]
pub trait ReferenceDataPort: DomainPort {
    /// Active location types
    async fn location_types(&self) -> Result<Vec<OptionItem>, PortError>;

    /// Active financial types
    async fn financial_types(&self) -> Result<Vec<OptionItem>, PortError>;

    /// Active campaigns
    async fn campaigns(&self) -> Result<Vec<OptionItem>, PortError>;

    /// Payment instrument option values
    async fn payment_instruments(&self) -> Result<Vec<OptionItem>, PortError>;

    /// Active groups of the "Mailing List" group type
    async fn mailing_list_groups(&self) -> Result<Vec<OptionItem>, PortError>;
}

/// In-memory implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Settings store keeping the collection in memory
    ///
    /// Clones share the same storage, which lets a test hand one clone to a
    /// registry and inspect or reuse the data through another.
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySettingsStore {
        data: Arc<RwLock<Option<StoredProfiles>>>,
        writes: Arc<AtomicUsize>,
        fail_writes: Arc<AtomicBool>,
    }

    impl InMemorySettingsStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a store pre-populated with a collection
        pub fn with_profiles(profiles: StoredProfiles) -> Self {
            Self {
                data: Arc::new(RwLock::new(Some(profiles))),
                ..Self::default()
            }
        }

        /// Returns the currently stored collection
        pub async fn snapshot(&self) -> Option<StoredProfiles> {
            self.data.read().await.clone()
        }

        /// Number of successful `store_profiles` calls
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Makes subsequent writes fail with a connection error
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl DomainPort for InMemorySettingsStore {}

    #[async_trait]
    impl SettingsPort for InMemorySettingsStore {
        async fn load_profiles(&self) -> Result<Option<StoredProfiles>, PortError> {
            Ok(self.data.read().await.clone())
        }

        async fn store_profiles(&self, profiles: &StoredProfiles) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::connection("settings store unavailable"));
            }
            *self.data.write().await = Some(profiles.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Reference data served from fixed lists
    #[derive(Debug, Clone, Default)]
    pub struct StaticReferenceData {
        pub location_types: Vec<OptionItem>,
        pub financial_types: Vec<OptionItem>,
        pub campaigns: Vec<OptionItem>,
        pub payment_instruments: Vec<OptionItem>,
        pub mailing_list_groups: Vec<OptionItem>,
        lookups: Arc<AtomicUsize>,
    }

    impl StaticReferenceData {
        /// Reference data resembling a fresh CiviCRM installation
        pub fn civicrm_defaults() -> Self {
            Self {
                location_types: vec![
                    OptionItem::new("1", "Home"),
                    OptionItem::new("2", "Work"),
                    OptionItem::new("3", "Main"),
                ],
                financial_types: vec![
                    OptionItem::new("1", "Donation"),
                    OptionItem::new("2", "Member Dues"),
                ],
                campaigns: vec![OptionItem::new("7", "Spring appeal")],
                payment_instruments: vec![
                    OptionItem::new("1", "Credit Card"),
                    OptionItem::new("3", "Debit Card"),
                    OptionItem::new("5", "EFT"),
                ],
                mailing_list_groups: vec![OptionItem::new("4", "Newsletter")],
                lookups: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Number of payment instrument lookups served
        pub fn payment_instrument_lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl DomainPort for StaticReferenceData {}

    #[async_trait]
    impl ReferenceDataPort for StaticReferenceData {
        async fn location_types(&self) -> Result<Vec<OptionItem>, PortError> {
            Ok(self.location_types.clone())
        }

        async fn financial_types(&self) -> Result<Vec<OptionItem>, PortError> {
            Ok(self.financial_types.clone())
        }

        async fn campaigns(&self) -> Result<Vec<OptionItem>, PortError> {
            Ok(self.campaigns.clone())
        }

        async fn payment_instruments(&self) -> Result<Vec<OptionItem>, PortError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.payment_instruments.clone())
        }

        async fn mailing_list_groups(&self) -> Result<Vec<OptionItem>, PortError> {
            Ok(self.mailing_list_groups.clone())
        }
    }
}
