//! Pre-built Test Fixtures
//!
//! Ready-to-use submissions and profiles for the bridge's test suites. The
//! values are fixed so assertions can refer to them directly.

use fake::faker::address::en::{CityName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::{json, Value};

use core_kernel::{CampaignId, ContactId, GroupId};
use domain_donation::Submission;
use domain_profile::{Profile, StoredProfiles, DEFAULT_PROFILE_NAME};

/// Fixture for submission test data
pub struct SubmissionFixtures;

impl SubmissionFixtures {
    /// Epoch seconds of 2023-11-14 22:13:20 UTC
    pub const TIME: i64 = 1_700_000_000;

    /// The same instant in Europe/Berlin, as CiviCRM expects it
    pub const RECEIVE_DATE: &'static str = "20231114231320";

    /// A private donation of 10.50 EUR through form `F1`, paid by PayPal
    pub fn private_donation() -> Submission {
        Submission {
            form_id: "F1".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: "jane.doe@example.org".to_string(),
            street_address: Some("Hauptstraße 1".to_string()),
            postal_code: Some("10115".to_string()),
            city: Some("Berlin".to_string()),
            country: Some("DE".to_string()),
            donation_id: Some("D-1001".to_string()),
            time: Some(Self::TIME),
            amount_in_cents: 1050,
            payment_method: "paypal".to_string(),
            ..Default::default()
        }
    }

    /// A donation made on behalf of an organisation
    pub fn company_donation() -> Submission {
        Submission {
            organization_name: Some("ACME GmbH".to_string()),
            ..Self::private_donation()
        }
    }

    /// A donation with randomly generated donor data
    pub fn random_donation() -> Submission {
        Submission {
            first_name: Some(FirstName().fake()),
            last_name: Some(LastName().fake()),
            email: SafeEmail().fake(),
            street_address: Some(StreetName().fake()),
            postal_code: Some(ZipCode().fake()),
            city: Some(CityName().fake()),
            organization_name: Some(CompanyName().fake()),
            ..Self::private_donation()
        }
    }

    /// The private donation as the webhook posts it, every value as text
    pub fn webhook_payload() -> Value {
        json!({
            "form_id": "F1",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane.doe@example.org",
            "street_address": "Hauptstraße 1",
            "postal_code": "10115",
            "city": "Berlin",
            "country": "DE",
            "organization_name": "",
            "donation_id": "D-1001",
            "time": "1700000000",
            "amount_in_cents": "1050",
            "payment_method": "paypal",
            "campaign": "",
            "newsletter": "0",
            "webhook_id": "wh-1"
        })
    }
}

/// Fixture for profile test data
pub struct ProfileFixtures;

impl ProfileFixtures {
    /// Campaign used by [`ProfileFixtures::campaign_x`]
    pub fn campaign_id() -> CampaignId {
        CampaignId::new(7).unwrap()
    }

    /// Newsletter group used by [`ProfileFixtures::campaign_x`]
    pub fn newsletter_group() -> GroupId {
        GroupId::new(4).unwrap()
    }

    /// A second newsletter group
    pub fn members_group() -> GroupId {
        GroupId::new(9).unwrap()
    }

    /// The catch-all profile with factory settings
    pub fn default_profile() -> Profile {
        Profile::factory_default(DEFAULT_PROFILE_NAME)
    }

    /// Profile "campaign-x" for forms `F1` and `F2`, with a campaign and two
    /// newsletter groups
    pub fn campaign_x() -> Profile {
        Profile::factory_default("campaign-x")
            .with_selector("F1,F2")
            .with_campaign(Some(Self::campaign_id()))
            .with_groups(vec![Self::newsletter_group(), Self::members_group()])
    }

    /// Stored representation of the given profiles
    pub fn stored(profiles: &[Profile]) -> StoredProfiles {
        profiles
            .iter()
            .map(|profile| (profile.name().to_string(), profile.to_stored()))
            .collect()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn contact_id() -> ContactId {
        ContactId::new(42).unwrap()
    }

    pub fn organisation_id() -> ContactId {
        ContactId::new(43).unwrap()
    }
}
