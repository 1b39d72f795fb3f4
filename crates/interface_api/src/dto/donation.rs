//! Submission endpoint envelopes
//!
//! betterplace.org talks to the bridge as if it were the CiviCRM APIv3, so
//! responses follow that envelope.

use std::collections::BTreeMap;

use serde::Serialize;

use domain_donation::{Contribution, DonationReceipt};

/// Successful submission
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope {
    pub is_error: u8,
    pub version: u8,
    pub count: usize,
    pub id: i64,
    /// The contribution keyed by its id
    pub values: BTreeMap<String, Contribution>,
    /// Id betterplace.org stores as reference for the donation
    pub foreign_id: i64,
}

impl From<DonationReceipt> for SuccessEnvelope {
    fn from(receipt: DonationReceipt) -> Self {
        let id = receipt.contribution.id.get();
        Self {
            is_error: 0,
            version: 3,
            count: 1,
            id,
            values: BTreeMap::from([(id.to_string(), receipt.contribution)]),
            foreign_id: receipt.foreign_id,
        }
    }
}

/// Failed submission
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub is_error: u8,
    pub error_message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            is_error: 1,
            error_message: message.into(),
        }
    }
}
