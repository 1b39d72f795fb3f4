//! Donation submissions
//!
//! A submission is the parameter set betterplace.org posts for one donation.
//! It is decoded leniently, since the webhook sends every value as text, and
//! then validated before any CRM call is made.

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::lenient;

use crate::error::DonationError;

/// Postal address parts of a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    pub country: Option<String>,
}

impl AddressFields {
    /// Returns true if no part of the address is set
    pub fn is_empty(&self) -> bool {
        self.street_address.is_none()
            && self.postal_code.is_none()
            && self.city.is_none()
            && self.country.is_none()
    }
}

/// One donation as submitted by betterplace.org
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Submission {
    /// betterplace.org form the donation was made through
    #[validate(length(min = 1, message = "form_id must not be empty"))]
    #[serde(deserialize_with = "lenient::string")]
    pub form_id: String,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,

    #[validate(email(message = "email must be an e-mail address"))]
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub street_address: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub postal_code: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub organization_name: Option<String>,

    /// betterplace.org donation id, recorded as the transaction id
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub donation_id: Option<String>,

    /// Donation time in epoch seconds
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub time: Option<i64>,

    #[validate(range(min = 0, message = "amount_in_cents must not be negative"))]
    #[serde(deserialize_with = "lenient::int")]
    pub amount_in_cents: i64,

    #[validate(length(min = 1, message = "payment_method must not be empty"))]
    #[serde(deserialize_with = "lenient::string")]
    pub payment_method: String,

    /// betterplace.org campaign name, accepted but not used
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub campaign: Option<String>,

    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub newsletter: Option<bool>,

    /// Accepted but not used
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub webhook_id: Option<String>,
}

impl Submission {
    /// Runs the field validations
    pub fn check(&self) -> Result<(), DonationError> {
        self.validate()
            .map_err(|errors| DonationError::validation(errors.to_string()))
    }

    /// The organisation name, if one was submitted
    pub fn organisation(&self) -> Option<&str> {
        self.organization_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Whether the donor opted in to newsletters
    pub fn wants_newsletter(&self) -> bool {
        self.newsletter.unwrap_or(false)
    }

    /// Moves the address parts out of the submission
    pub fn take_address(&mut self) -> AddressFields {
        AddressFields {
            street_address: self.street_address.take(),
            postal_code: self.postal_code.take(),
            city: self.city.take(),
            country: self.country.take(),
        }
    }

    /// Returns a copy of the address parts
    pub fn address(&self) -> AddressFields {
        AddressFields {
            street_address: self.street_address.clone(),
            postal_code: self.postal_code.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
        }
    }
}
