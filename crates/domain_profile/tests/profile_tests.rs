//! Tests for the profile registry and profile persistence

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use core_kernel::{CampaignId, GroupId};
use domain_profile::{
    InMemorySettingsStore, Profile, ProfileAttribute, ProfileError, ProfileRegistry,
    StoredProfiles, DEFAULT_PROFILE_NAME,
};

fn registry_on(store: &InMemorySettingsStore) -> ProfileRegistry {
    ProfileRegistry::new(Arc::new(store.clone()))
}

// ============================================================================
// Registry Tests
// ============================================================================

mod registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_gets_persisted_default() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);

        let profiles = registry.profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert!(profiles[DEFAULT_PROFILE_NAME].is_default());

        let stored = store.snapshot().await.unwrap();
        assert!(stored.contains_key(DEFAULT_PROFILE_NAME));
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_default_not_rewritten_when_present() {
        let mut stored = StoredProfiles::new();
        stored.insert(
            DEFAULT_PROFILE_NAME.to_string(),
            Profile::factory_default(DEFAULT_PROFILE_NAME).to_stored(),
        );
        let store = InMemorySettingsStore::with_profiles(stored);
        let registry = registry_on(&store);

        registry.profiles().await.unwrap();
        registry.profiles().await.unwrap();
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_profile_lookup_by_name() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        assert!(registry.profile("missing").await.unwrap().is_none());
        assert!(registry.profile(DEFAULT_PROFILE_NAME).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_profile_for_form_selects_matching_profile() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry
            .save(Profile::factory_default("campaign-x").with_selector("F1,F2"))
            .await
            .unwrap();

        assert_eq!(registry.profile_for_form("F1").await.unwrap().name(), "campaign-x");
        assert_eq!(registry.profile_for_form("F2").await.unwrap().name(), "campaign-x");
        assert!(registry.profile_for_form("F3").await.unwrap().is_default());
        assert!(registry.profile_for_form("").await.unwrap().is_default());
    }

    #[tokio::test]
    async fn test_profile_for_form_scans_in_name_order() {
        let mut stored = StoredProfiles::new();
        stored.insert("zeta".to_string(), json!({"selector": "F1"}));
        stored.insert("alpha".to_string(), json!({"selector": "F1"}));
        let store = InMemorySettingsStore::with_profiles(stored);
        let registry = registry_on(&store);

        assert_eq!(registry.profile_for_form("F1").await.unwrap().name(), "alpha");
    }

    #[tokio::test]
    async fn test_save_and_reload_through_fresh_registry() {
        let store = InMemorySettingsStore::new();
        let profile = Profile::factory_default("campaign-x")
            .with_selector("F1,F2")
            .with_campaign(Some(CampaignId::new(7).unwrap()))
            .with_groups(vec![GroupId::new(4).unwrap(), GroupId::new(9).unwrap()]);

        registry_on(&store).save(profile.clone()).await.unwrap();

        let fresh = registry_on(&store);
        assert_eq!(fresh.profile("campaign-x").await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_changes() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.profiles().await.unwrap();

        registry_on(&store)
            .save(Profile::new("other").with_selector("F5"))
            .await
            .unwrap();
        assert!(registry.profile("other").await.unwrap().is_none());

        registry.reload().await;
        assert!(registry.profile("other").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_rejects_selector_conflict_without_mutation() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.save(Profile::new("a").with_selector("F1,F2")).await.unwrap();
        let writes = store.write_count();

        let result = registry.save(Profile::new("b").with_selector("F2")).await;
        assert!(matches!(result, Err(ProfileError::SelectorConflict { .. })));
        assert!(registry.profile("b").await.unwrap().is_none());
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_save_persistence_failure_leaves_cache_unchanged() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.profiles().await.unwrap();

        store.set_fail_writes(true);
        let result = registry.save(Profile::new("x").with_selector("F1")).await;
        assert!(matches!(result, Err(ProfileError::Storage(_))));
        assert!(registry.profile("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_is_rejected() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.save(Profile::new("a").with_selector("F1")).await.unwrap();
        registry.save(Profile::new("b").with_selector("F7")).await.unwrap();
        let writes = store.write_count();

        let result = registry
            .save_replacing(Profile::new("b").with_selector("F1"), "a")
            .await;

        assert!(matches!(result, Err(ProfileError::NameTaken(ref name)) if name == "b"));
        assert_eq!(store.write_count(), writes);
        let stored = store.snapshot().await.unwrap();
        assert!(stored.contains_key("a"));
        assert!(registry.profile("b").await.unwrap().unwrap().matches("F7"));
    }

    #[tokio::test]
    async fn test_rename_to_free_name_moves_entry() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.save(Profile::new("a").with_selector("F1")).await.unwrap();

        registry
            .save_replacing(Profile::new("c").with_selector("F1"), "a")
            .await
            .unwrap();

        let stored = store.snapshot().await.unwrap();
        assert!(!stored.contains_key("a"));
        assert!(stored.contains_key("c"));
    }

    #[tokio::test]
    async fn test_create_rejects_taken_name() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.create(Profile::new("a").with_selector("F1")).await.unwrap();

        let result = registry.create(Profile::new("a").with_selector("F2")).await;
        assert!(matches!(result, Err(ProfileError::NameTaken(_))));

        let result = registry.create(Profile::new(DEFAULT_PROFILE_NAME)).await;
        assert!(matches!(result, Err(ProfileError::NameTaken(_))));
        assert!(registry.profile("a").await.unwrap().unwrap().matches("F1"));
    }

    #[tokio::test]
    async fn test_default_persistence_failure_is_reported_and_retried() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);

        store.set_fail_writes(true);
        let result = registry.profiles().await;
        assert!(matches!(result, Err(ProfileError::Storage(_))));
        assert!(store.snapshot().await.is_none());

        store.set_fail_writes(false);
        let profiles = registry.profiles().await.unwrap();
        assert!(profiles.contains_key(DEFAULT_PROFILE_NAME));
        assert!(store.snapshot().await.unwrap().contains_key(DEFAULT_PROFILE_NAME));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        registry.save(Profile::new("a").with_selector("F1")).await.unwrap();

        assert!(registry.delete("a").await.unwrap());
        assert!(!registry.delete("a").await.unwrap());
        assert!(!store.snapshot().await.unwrap().contains_key("a"));
    }

    #[tokio::test]
    async fn test_deleted_default_is_resynthesized() {
        let store = InMemorySettingsStore::new();
        let registry = registry_on(&store);
        assert!(registry.delete(DEFAULT_PROFILE_NAME).await.unwrap());

        let profiles = registry.profiles().await.unwrap();
        assert!(profiles.contains_key(DEFAULT_PROFILE_NAME));
        assert!(store.snapshot().await.unwrap().contains_key(DEFAULT_PROFILE_NAME));
    }

    #[tokio::test]
    async fn test_damaged_stored_profile_is_loaded_leniently() {
        let mut stored = StoredProfiles::new();
        stored.insert(
            "legacy".to_string(),
            json!({"selector": "F7", "financial_type_id": "abc", "colour": "red"}),
        );
        let store = InMemorySettingsStore::with_profiles(stored);
        let registry = registry_on(&store);

        let profile = registry.profile_for_form("F7").await.unwrap();
        assert_eq!(profile.name(), "legacy");
        assert!(profile.financial_type_id().is_none());
    }
}

// ============================================================================
// Attribute Tests
// ============================================================================

mod attribute_tests {
    use super::*;

    #[test]
    fn test_unknown_attribute_leaves_profile_unchanged() {
        let mut profile = Profile::factory_default("p");
        let before = profile.clone();
        let result = profile.set_attribute_str("pi_bitcoin", &json!(1));
        assert!(matches!(result, Err(ProfileError::UnknownAttribute(_))));
        assert_eq!(profile, before);
    }

    #[test]
    fn test_unknown_attribute_is_configuration_error() {
        assert!(ProfileError::UnknownAttribute("x".into()).is_configuration_error());
    }

    #[test]
    fn test_every_attribute_round_trips_through_string_key() {
        let source = Profile::factory_default("p")
            .with_selector("F1")
            .with_groups(vec![GroupId::new(3).unwrap()]);
        let mut target = Profile::new("p");
        for attribute in ProfileAttribute::ALL {
            target
                .set_attribute_str(attribute.as_str(), &source.attribute(attribute))
                .unwrap();
        }
        assert_eq!(target, source);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn form_id_strategy() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{1,4}"
}

proptest! {
    #[test]
    fn prop_selector_matches_exactly_its_tokens(
        tokens in prop::collection::vec(form_id_strategy(), 0..6),
        form_id in form_id_strategy(),
    ) {
        let profile = Profile::new("p").with_selector(tokens.join(" , ").as_str());
        prop_assert_eq!(profile.matches(&form_id), tokens.contains(&form_id));
    }

    #[test]
    fn prop_stored_round_trip(
        tokens in prop::collection::vec(form_id_strategy(), 0..4),
        campaign in prop::option::of(1i64..1000),
        groups in prop::collection::vec(1i64..500, 0..4),
    ) {
        let profile = Profile::factory_default("p")
            .with_selector(tokens.join(",").as_str())
            .with_campaign(campaign.map(|id| CampaignId::new(id).unwrap()))
            .with_groups(groups.into_iter().map(|id| GroupId::new(id).unwrap()).collect());
        let restored = Profile::from_stored("p", &profile.to_stored());
        prop_assert_eq!(restored, profile);
    }
}
