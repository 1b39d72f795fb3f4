//! Donation domain errors
//!
//! Each variant corresponds to one way a submission can be refused. The
//! display strings of the contact, payment and contribution variants are the
//! messages reported back to betterplace.org.

use thiserror::Error;

use core_kernel::PortError;
use domain_profile::ProfileError;

/// Errors that can occur while processing a submission
#[derive(Debug, Error)]
pub enum DonationError {
    /// The submission itself is malformed
    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Individual contact could not be found or created.")]
    IndividualContact(#[source] PortError),

    #[error("Organisation contact could not be found or created.")]
    OrganisationContact(#[source] PortError),

    /// The submitted address could neither be shared nor stored on the donor
    #[error("Address could not be created.")]
    Address(#[source] PortError),

    /// The payment method has no instrument in the selected profile
    #[error("Payment method could not be matched to existing payment instrument.")]
    UnknownPaymentMethod(String),

    #[error("Contribution could not be created.")]
    Contribution(String),

    /// The profile collection could not be read
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl DonationError {
    /// Creates a Validation error from a message
    pub fn validation(message: impl Into<String>) -> Self {
        DonationError::Validation(message.into())
    }

    /// Creates a Contribution error from a reason
    pub fn contribution(reason: impl std::fmt::Display) -> Self {
        DonationError::Contribution(reason.to_string())
    }

    /// Returns true if the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DonationError::Validation(_) | DonationError::UnknownPaymentMethod(_)
        )
    }
}
