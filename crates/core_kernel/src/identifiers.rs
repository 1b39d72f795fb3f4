//! Strongly-typed identifiers for CRM entities
//!
//! CiviCRM identifies every record with a positive integer. Wrapping them in
//! newtypes keeps contact ids from being passed where a group id is expected,
//! while still (de)serializing as plain numbers. Deserialization also accepts
//! numeric strings, since the CiviCRM REST API returns ids as text.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::lenient;

/// Error returned when parsing an identifier fails
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("invalid {kind} id: {value}")]
    Invalid { kind: &'static str, value: String },

    #[error("{kind} id must be positive, got {value}")]
    NotPositive { kind: &'static str, value: i64 },
}

macro_rules! define_id {
    ($name:ident, $kind:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier, rejecting zero and negative values
            pub fn new(value: i64) -> Result<Self, IdError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(IdError::NotPositive { kind: $kind, value })
                }
            }

            /// Returns the raw integer value
            pub fn get(&self) -> i64 {
                self.0
            }

            /// Returns the entity kind name
            pub fn kind() -> &'static str {
                $kind
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim().parse::<i64>().map_err(|_| IdError::Invalid {
                    kind: $kind,
                    value: s.to_string(),
                })?;
                Self::new(value)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = IdError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = lenient::int(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

// Contacts and their records
define_id!(ContactId, "contact");
define_id!(AddressId, "address");
define_id!(GroupId, "group");

// Contributions and the reference data they point at
define_id!(ContributionId, "contribution");
define_id!(CampaignId, "campaign");
define_id!(FinancialTypeId, "financial type");
define_id!(LocationTypeId, "location type");
define_id!(PaymentInstrumentId, "payment instrument");

impl LocationTypeId {
    /// CiviCRM's built-in "Work" location type
    pub const WORK: LocationTypeId = LocationTypeId(2);
}

impl FinancialTypeId {
    /// CiviCRM's built-in "Donation" financial type
    pub const DONATION: FinancialTypeId = FinancialTypeId(1);
}

impl PaymentInstrumentId {
    /// "Credit Card"
    pub const CREDIT_CARD: PaymentInstrumentId = PaymentInstrumentId(1);
    /// "Debit"
    pub const DEBIT: PaymentInstrumentId = PaymentInstrumentId(3);
    /// "EFT"
    pub const EFT: PaymentInstrumentId = PaymentInstrumentId(5);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_positive() {
        assert!(ContactId::new(0).is_err());
        assert!(ContactId::new(-3).is_err());
        assert_eq!(ContactId::new(12).unwrap().get(), 12);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("42".parse::<GroupId>().unwrap().get(), 42);
        assert!(matches!(
            "x".parse::<GroupId>(),
            Err(IdError::Invalid { kind: "group", .. })
        ));
    }

    #[test]
    fn test_deserialize_accepts_numeric_strings() {
        let id: ContributionId = serde_json::from_str("\"77\"").unwrap();
        assert_eq!(id.get(), 77);
        let id: ContributionId = serde_json::from_str("78").unwrap();
        assert_eq!(id.get(), 78);
        assert!(serde_json::from_str::<ContributionId>("\"0\"").is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let id = ContactId::new(5).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "5");
    }
}
