//! Profile DTOs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use core_kernel::lenient;
use domain_profile::Profile;

/// A profile with all of its attributes
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub is_default: bool,
    pub attributes: BTreeMap<String, Value>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        let attributes = match profile.to_stored() {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            name: profile.name().to_string(),
            is_default: profile.is_default(),
            attributes,
        }
    }
}

/// Query string of the profile editor routes
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileFormQuery {
    /// Profile to edit
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 128))]
    pub name: Option<String>,

    /// Ask for a blank profile when no name is given
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub new: Option<bool>,
}

impl ProfileFormQuery {
    pub fn is_new(&self) -> bool {
        self.new.unwrap_or(false)
    }
}
