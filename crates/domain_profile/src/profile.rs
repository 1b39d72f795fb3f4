//! Profile model
//!
//! A profile is a closed record: the eight attributes below are the only ones
//! a profile can have. Admin forms and stored settings address attributes by
//! name, so string keys are mapped onto [`ProfileAttribute`] and anything else
//! is rejected before the profile is touched.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};
use tracing::warn;

use core_kernel::lenient::{value_to_id_list, value_to_opt_i64, value_to_opt_string};
use core_kernel::{
    CampaignId, FinancialTypeId, GroupId, LocationTypeId, PaymentInstrumentId,
};

use crate::error::ProfileError;

/// Name of the profile that handles forms no other profile claims
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Persisted shape of the profile collection: profile name to attribute map
pub type StoredProfiles = BTreeMap<String, Value>;

/// The fixed set of profile attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileAttribute {
    Selector,
    LocationTypeId,
    FinancialTypeId,
    CampaignId,
    PiCreditcard,
    PiSepa,
    PiPaypal,
    Groups,
}

impl ProfileAttribute {
    /// All attributes, in storage order
    pub const ALL: [ProfileAttribute; 8] = [
        ProfileAttribute::Selector,
        ProfileAttribute::LocationTypeId,
        ProfileAttribute::FinancialTypeId,
        ProfileAttribute::CampaignId,
        ProfileAttribute::PiCreditcard,
        ProfileAttribute::PiSepa,
        ProfileAttribute::PiPaypal,
        ProfileAttribute::Groups,
    ];

    /// Returns the attribute's storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileAttribute::Selector => "selector",
            ProfileAttribute::LocationTypeId => "location_type_id",
            ProfileAttribute::FinancialTypeId => "financial_type_id",
            ProfileAttribute::CampaignId => "campaign_id",
            ProfileAttribute::PiCreditcard => "pi_creditcard",
            ProfileAttribute::PiSepa => "pi_sepa",
            ProfileAttribute::PiPaypal => "pi_paypal",
            ProfileAttribute::Groups => "groups",
        }
    }
}

impl fmt::Display for ProfileAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileAttribute {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileAttribute::ALL
            .into_iter()
            .find(|attribute| attribute.as_str() == s)
            .ok_or_else(|| ProfileError::UnknownAttribute(s.to_string()))
    }
}

/// Comma-separated list of betterplace.org form ids
///
/// Tokens are trimmed and blank tokens dropped, so an empty selector matches
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector(Vec<String>);

impl Selector {
    /// Parses a comma-separated selector
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns true if the selector lists the form id
    pub fn contains(&self, form_id: &str) -> bool {
        self.0.iter().any(|token| token == form_id)
    }

    /// Returns the form ids listed by both selectors
    pub fn shared_with(&self, other: &Selector) -> Vec<String> {
        self.0
            .iter()
            .filter(|token| other.contains(token))
            .cloned()
            .collect()
    }

    /// Returns the listed form ids
    pub fn form_ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::parse(raw)
    }
}

/// A named set of rules for recording submissions in the CRM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    selector: Selector,
    location_type_id: Option<LocationTypeId>,
    financial_type_id: Option<FinancialTypeId>,
    campaign_id: Option<CampaignId>,
    pi_creditcard: Option<PaymentInstrumentId>,
    pi_sepa: Option<PaymentInstrumentId>,
    pi_paypal: Option<PaymentInstrumentId>,
    groups: Vec<GroupId>,
}

impl Profile {
    /// Creates a profile with every attribute unset
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: Selector::default(),
            location_type_id: None,
            financial_type_id: None,
            campaign_id: None,
            pi_creditcard: None,
            pi_sepa: None,
            pi_paypal: None,
            groups: Vec::new(),
        }
    }

    /// Creates a profile with the factory settings
    ///
    /// Work address, "Donation" financial type, credit card recorded as
    /// "Credit Card", SEPA as "EFT" and PayPal as "Debit".
    pub fn factory_default(name: impl Into<String>) -> Self {
        Self {
            location_type_id: Some(LocationTypeId::WORK),
            financial_type_id: Some(FinancialTypeId::DONATION),
            pi_creditcard: Some(PaymentInstrumentId::CREDIT_CARD),
            pi_sepa: Some(PaymentInstrumentId::EFT),
            pi_paypal: Some(PaymentInstrumentId::DEBIT),
            ..Self::new(name)
        }
    }

    /// Rebuilds a profile from its stored attribute map
    ///
    /// Unknown keys and values that cannot be interpreted are skipped with a
    /// warning, so one damaged entry does not take the whole collection down.
    pub fn from_stored(name: impl Into<String>, data: &Value) -> Self {
        let mut profile = Profile::new(name);
        let Some(map) = data.as_object() else {
            warn!(profile = %profile.name, "Stored profile is not an attribute map, using empty profile");
            return profile;
        };

        for (key, value) in map {
            if let Err(error) = profile.set_attribute_str(key, value) {
                warn!(profile = %profile.name, attribute = %key, %error, "Skipping stored profile attribute");
            }
        }
        profile
    }

    /// Returns the attribute map persisted for this profile
    pub fn to_stored(&self) -> Value {
        let mut map = Map::new();
        for attribute in ProfileAttribute::ALL {
            map.insert(attribute.as_str().to_string(), self.attribute(attribute));
        }
        Value::Object(map)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns true for the catch-all profile
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_PROFILE_NAME
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn location_type_id(&self) -> Option<LocationTypeId> {
        self.location_type_id
    }

    pub fn financial_type_id(&self) -> Option<FinancialTypeId> {
        self.financial_type_id
    }

    pub fn campaign_id(&self) -> Option<CampaignId> {
        self.campaign_id
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    /// Checks whether the profile's selector lists the given form id
    pub fn matches(&self, form_id: &str) -> bool {
        self.selector.contains(form_id)
    }

    /// Maps a betterplace.org payment method to the configured instrument
    ///
    /// The method is looked up as the `pi_<method>` attribute; methods without
    /// such an attribute, or with the attribute unset, yield `None`.
    pub fn payment_instrument(&self, method: &str) -> Option<PaymentInstrumentId> {
        match format!("pi_{}", method).parse::<ProfileAttribute>() {
            Ok(ProfileAttribute::PiCreditcard) => self.pi_creditcard,
            Ok(ProfileAttribute::PiSepa) => self.pi_sepa,
            Ok(ProfileAttribute::PiPaypal) => self.pi_paypal,
            _ => None,
        }
    }

    /// Returns an attribute's value in its stored representation
    pub fn attribute(&self, attribute: ProfileAttribute) -> Value {
        fn id<T: Into<i64> + Copy>(value: Option<T>) -> Value {
            value.map_or(Value::Null, |v| json!(v.into()))
        }

        match attribute {
            ProfileAttribute::Selector => Value::String(self.selector.to_string()),
            ProfileAttribute::LocationTypeId => id(self.location_type_id),
            ProfileAttribute::FinancialTypeId => id(self.financial_type_id),
            ProfileAttribute::CampaignId => id(self.campaign_id),
            ProfileAttribute::PiCreditcard => id(self.pi_creditcard),
            ProfileAttribute::PiSepa => id(self.pi_sepa),
            ProfileAttribute::PiPaypal => id(self.pi_paypal),
            ProfileAttribute::Groups => {
                Value::Array(self.groups.iter().map(|g| json!(g.get())).collect())
            }
        }
    }

    /// Sets an attribute from a loosely typed value
    ///
    /// The profile is left unchanged when the value cannot be interpreted.
    pub fn set_attribute(&mut self, attribute: ProfileAttribute, value: &Value) -> Result<(), ProfileError> {
        fn id<T: TryFrom<i64>>(attribute: ProfileAttribute, value: &Value) -> Result<Option<T>, ProfileError>
        where
            T::Error: fmt::Display,
        {
            value_to_opt_i64(value)
                .map_err(|e| ProfileError::invalid(attribute.as_str(), e))?
                .map(|raw| T::try_from(raw).map_err(|e| ProfileError::invalid(attribute.as_str(), e)))
                .transpose()
        }

        match attribute {
            ProfileAttribute::Selector => {
                let raw = value_to_opt_string(value)
                    .map_err(|e| ProfileError::invalid(attribute.as_str(), e))?;
                self.selector = Selector::parse(raw.as_deref().unwrap_or_default());
            }
            ProfileAttribute::LocationTypeId => self.location_type_id = id(attribute, value)?,
            ProfileAttribute::FinancialTypeId => self.financial_type_id = id(attribute, value)?,
            ProfileAttribute::CampaignId => self.campaign_id = id(attribute, value)?,
            ProfileAttribute::PiCreditcard => self.pi_creditcard = id(attribute, value)?,
            ProfileAttribute::PiSepa => self.pi_sepa = id(attribute, value)?,
            ProfileAttribute::PiPaypal => self.pi_paypal = id(attribute, value)?,
            ProfileAttribute::Groups => {
                let groups = value_to_id_list(value)
                    .map_err(|e| ProfileError::invalid(attribute.as_str(), e))?
                    .into_iter()
                    .map(|raw| GroupId::new(raw).map_err(|e| ProfileError::invalid(attribute.as_str(), e)))
                    .collect::<Result<Vec<_>, _>>()?;
                self.groups = groups;
            }
        }
        Ok(())
    }

    /// Sets an attribute addressed by its storage key
    ///
    /// Fails with [`ProfileError::UnknownAttribute`] for keys outside the
    /// attribute set, leaving the profile unchanged.
    pub fn set_attribute_str(&mut self, key: &str, value: &Value) -> Result<(), ProfileError> {
        let attribute = key.parse::<ProfileAttribute>()?;
        self.set_attribute(attribute, value)
    }

    /// Builder-style setter for the selector
    pub fn with_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Builder-style setter for the newsletter groups
    pub fn with_groups(mut self, groups: Vec<GroupId>) -> Self {
        self.groups = groups;
        self
    }

    /// Builder-style setter for the campaign
    pub fn with_campaign(mut self, campaign_id: Option<CampaignId>) -> Self {
        self.campaign_id = campaign_id;
        self
    }

    /// Builder-style setter for the financial type
    pub fn with_financial_type(mut self, financial_type_id: Option<FinancialTypeId>) -> Self {
        self.financial_type_id = financial_type_id;
        self
    }
}
