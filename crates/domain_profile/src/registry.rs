//! Profile Registry
//!
//! Owns the in-memory copy of the profile collection for the lifetime of the
//! process (or of whatever scope constructs it). The collection is read from
//! the [`SettingsPort`] on first use and written back as a whole on every
//! mutation.
//!
//! The registry guarantees a `default` profile: whenever the collection lacks
//! one, the factory default is synthesized and persisted.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::ProfileError;
use crate::ports::SettingsPort;
use crate::profile::{Profile, StoredProfiles, DEFAULT_PROFILE_NAME};
use crate::validation::{ProfileValidator, SaveMode};

type Collection = BTreeMap<String, Profile>;

/// Context-scoped registry of profiles
pub struct ProfileRegistry {
    settings: Arc<dyn SettingsPort>,
    validator: ProfileValidator,
    cache: RwLock<Option<Collection>>,
}

impl std::fmt::Debug for ProfileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRegistry").finish_non_exhaustive()
    }
}

impl ProfileRegistry {
    /// Creates a registry over the given settings store
    ///
    /// Nothing is loaded until the first access.
    pub fn new(settings: Arc<dyn SettingsPort>) -> Self {
        Self {
            settings,
            validator: ProfileValidator::new(),
            cache: RwLock::new(None),
        }
    }

    /// Returns all profiles by name, including the default profile
    pub async fn profiles(&self) -> Result<BTreeMap<String, Profile>, ProfileError> {
        {
            let cache = self.cache.read().await;
            if let Some(collection) = cache.as_ref() {
                if collection.contains_key(DEFAULT_PROFILE_NAME) {
                    return Ok(collection.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        let collection = self.ensure_loaded(&mut cache).await?;
        Ok(collection.clone())
    }

    /// Returns the profile with the given name, if any
    pub async fn profile(&self, name: &str) -> Result<Option<Profile>, ProfileError> {
        Ok(self.profiles().await?.remove(name))
    }

    /// Returns the profile responsible for a betterplace.org form
    ///
    /// Profiles are scanned in name order and the first one whose selector
    /// lists the form id wins. Falls back to the default profile.
    #[instrument(skip(self))]
    pub async fn profile_for_form(&self, form_id: &str) -> Result<Profile, ProfileError> {
        let mut profiles = self.profiles().await?;

        if let Some(profile) = profiles.values().find(|p| p.matches(form_id)) {
            debug!(profile = %profile.name(), "Form matched profile selector");
            return Ok(profile.clone());
        }

        debug!("No profile selector matched, using default profile");
        profiles
            .remove(DEFAULT_PROFILE_NAME)
            .ok_or_else(|| ProfileError::NotFound(DEFAULT_PROFILE_NAME.to_string()))
    }

    /// Inserts or overwrites a profile and persists the collection
    pub async fn save(&self, profile: Profile) -> Result<(), ProfileError> {
        self.store(profile, SaveMode::Upsert).await
    }

    /// Saves a new profile, failing if its name is already in use
    pub async fn create(&self, profile: Profile) -> Result<(), ProfileError> {
        self.store(profile, SaveMode::Create).await
    }

    /// Saves a profile that supersedes the entry stored as `previous_name`
    ///
    /// Used when a profile is edited and possibly renamed: the old entry is
    /// removed in the same write. Renaming onto the name of another stored
    /// profile fails.
    pub async fn save_replacing(&self, profile: Profile, previous_name: &str) -> Result<(), ProfileError> {
        self.store(profile, SaveMode::Replace(previous_name)).await
    }

    #[instrument(skip(self, profile), fields(profile = %profile.name()))]
    async fn store(&self, profile: Profile, mode: SaveMode<'_>) -> Result<(), ProfileError> {
        let mut cache = self.cache.write().await;
        let current = self.ensure_loaded(&mut cache).await?;

        self.validator.validate(&profile, current, mode)?;

        let mut candidate = current.clone();
        if let Some(previous) = mode.replaced(&profile) {
            candidate.remove(previous);
        }
        candidate.insert(profile.name().to_string(), profile);

        self.persist(&candidate).await?;
        *cache = Some(candidate);
        info!("Profile saved");
        Ok(())
    }

    /// Deletes a profile and persists the collection
    ///
    /// # Returns
    ///
    /// Whether a profile with that name existed. Deleting the default profile
    /// is allowed; it is synthesized again on the next access.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<bool, ProfileError> {
        let mut cache = self.cache.write().await;
        let current = self.ensure_loaded(&mut cache).await?;

        if !current.contains_key(name) {
            return Ok(false);
        }

        let mut candidate = current.clone();
        candidate.remove(name);
        self.persist(&candidate).await?;
        *cache = Some(candidate);
        info!("Profile deleted");
        Ok(true)
    }

    /// Drops the cached collection so the next access reads the store again
    pub async fn reload(&self) {
        *self.cache.write().await = None;
    }

    /// Loads the collection if needed and makes sure the default exists
    async fn ensure_loaded<'a>(
        &self,
        cache: &'a mut Option<Collection>,
    ) -> Result<&'a mut Collection, ProfileError> {
        if cache.is_none() {
            let stored = self.settings.load_profiles().await?.unwrap_or_default();
            let collection: Collection = stored
                .iter()
                .map(|(name, data)| (name.clone(), Profile::from_stored(name.clone(), data)))
                .collect();
            debug!(count = collection.len(), "Loaded profiles from settings");
            *cache = Some(collection);
        }

        let collection = cache.get_or_insert_with(Collection::new);
        if !collection.contains_key(DEFAULT_PROFILE_NAME) {
            info!("No default profile stored, creating it from factory settings");
            let mut augmented = collection.clone();
            augmented.insert(
                DEFAULT_PROFILE_NAME.to_string(),
                Profile::factory_default(DEFAULT_PROFILE_NAME),
            );
            // Until the default is stored the cache keeps the collection as
            // loaded, so the next access tries again.
            self.persist(&augmented).await.map_err(|error| {
                warn!(%error, "Could not persist the synthesized default profile");
                error
            })?;
            *collection = augmented;
        }
        Ok(collection)
    }

    async fn persist(&self, collection: &Collection) -> Result<(), ProfileError> {
        let stored: StoredProfiles = collection
            .iter()
            .map(|(name, profile)| (name.clone(), profile.to_stored()))
            .collect();
        self.settings.store_profiles(&stored).await?;
        Ok(())
    }
}
