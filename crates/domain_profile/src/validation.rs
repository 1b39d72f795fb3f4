//! Profile validation
//!
//! Runs before a profile is saved. Besides basic consistency it rejects
//! selectors that claim form ids already claimed by another profile, since
//! form-id lookup could otherwise not tell which profile is meant.

use std::collections::BTreeMap;

use crate::error::ProfileError;
use crate::profile::Profile;

/// How a profile being saved relates to the stored collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode<'a> {
    /// Insert, or overwrite the entry of the same name
    Upsert,
    /// Insert a new profile under a name no other profile uses
    Create,
    /// Supersede the entry stored under the given name, renaming it if the
    /// profile's name differs
    Replace(&'a str),
}

impl<'a> SaveMode<'a> {
    /// Name of an entry the save removes, if any
    pub fn replaced(&self, profile: &Profile) -> Option<&'a str> {
        match *self {
            SaveMode::Replace(previous) if previous != profile.name() => Some(previous),
            _ => None,
        }
    }
}

/// Validator for profiles about to be saved
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileValidator;

impl ProfileValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates a profile against the rest of the collection
    ///
    /// # Arguments
    ///
    /// * `profile` - The profile about to be saved
    /// * `existing` - The collection it will be saved into
    /// * `mode` - Whether the profile is new, overwrites its namesake, or
    ///   supersedes another entry
    pub fn validate(
        &self,
        profile: &Profile,
        existing: &BTreeMap<String, Profile>,
        mode: SaveMode<'_>,
    ) -> Result<(), ProfileError> {
        let name = profile.name();
        if name.trim().is_empty() {
            return Err(ProfileError::MissingName);
        }

        let name_taken = match mode {
            SaveMode::Upsert => false,
            SaveMode::Create => existing.contains_key(name),
            SaveMode::Replace(previous) => previous != name && existing.contains_key(name),
        };
        if name_taken {
            return Err(ProfileError::NameTaken(name.to_string()));
        }

        let replaced = mode.replaced(profile);
        for (other_name, other) in existing {
            if other_name == name || Some(other_name.as_str()) == replaced {
                continue;
            }
            let shared = profile.selector().shared_with(other.selector());
            if !shared.is_empty() {
                return Err(ProfileError::SelectorConflict {
                    other: other_name.clone(),
                    form_ids: shared.join(","),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(profiles: Vec<Profile>) -> BTreeMap<String, Profile> {
        profiles
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect()
    }

    #[test]
    fn test_rejects_empty_name() {
        let result = ProfileValidator::new().validate(&Profile::new("  "), &BTreeMap::new(), SaveMode::Upsert);
        assert!(matches!(result, Err(ProfileError::MissingName)));
    }

    #[test]
    fn test_rejects_overlapping_selector() {
        let existing = collection(vec![Profile::new("a").with_selector("F1,F2")]);
        let candidate = Profile::new("b").with_selector("F2,F3");
        let result = ProfileValidator::new().validate(&candidate, &existing, SaveMode::Upsert);
        match result {
            Err(ProfileError::SelectorConflict { other, form_ids }) => {
                assert_eq!(other, "a");
                assert_eq!(form_ids, "F2");
            }
            other => panic!("expected selector conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_allows_overwriting_same_profile() {
        let existing = collection(vec![Profile::new("a").with_selector("F1")]);
        let candidate = Profile::new("a").with_selector("F1,F4");
        assert!(ProfileValidator::new().validate(&candidate, &existing, SaveMode::Upsert).is_ok());
    }

    #[test]
    fn test_ignores_profile_being_renamed() {
        let existing = collection(vec![Profile::new("old").with_selector("F1")]);
        let candidate = Profile::new("new").with_selector("F1");
        assert!(ProfileValidator::new()
            .validate(&candidate, &existing, SaveMode::Replace("old"))
            .is_ok());
    }

    #[test]
    fn test_rejects_rename_onto_existing_profile() {
        let existing = collection(vec![
            Profile::new("a").with_selector("F1"),
            Profile::new("b").with_selector("F7"),
        ]);
        let candidate = Profile::new("b").with_selector("F1");
        let result = ProfileValidator::new().validate(&candidate, &existing, SaveMode::Replace("a"));
        assert!(matches!(result, Err(ProfileError::NameTaken(ref name)) if name == "b"));
    }

    #[test]
    fn test_rejects_new_profile_with_taken_name() {
        let existing = collection(vec![Profile::new("a").with_selector("F1")]);
        let candidate = Profile::new("a").with_selector("F9");
        let result = ProfileValidator::new().validate(&candidate, &existing, SaveMode::Create);
        assert!(matches!(result, Err(ProfileError::NameTaken(_))));
        assert!(ProfileValidator::new()
            .validate(&Profile::new("c"), &existing, SaveMode::Create)
            .is_ok());
    }
}
