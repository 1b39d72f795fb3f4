//! Test Data Builders
//!
//! Builders start from the fixtures and let a test change only the fields it
//! is about.

use serde_json::{json, Value};

use core_kernel::{CampaignId, FinancialTypeId, GroupId};
use domain_donation::Submission;
use domain_profile::{Profile, ProfileAttribute};

use crate::fixtures::{ProfileFixtures, SubmissionFixtures};

/// Builder for submissions
#[derive(Debug, Clone)]
pub struct SubmissionBuilder {
    submission: Submission,
}

impl Default for SubmissionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionBuilder {
    /// Starts from [`SubmissionFixtures::private_donation`]
    pub fn new() -> Self {
        Self {
            submission: SubmissionFixtures::private_donation(),
        }
    }

    pub fn with_form_id(mut self, form_id: impl Into<String>) -> Self {
        self.submission.form_id = form_id.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.submission.email = email.into();
        self
    }

    pub fn with_amount_in_cents(mut self, amount: i64) -> Self {
        self.submission.amount_in_cents = amount;
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.submission.payment_method = method.into();
        self
    }

    pub fn with_organisation(mut self, name: impl Into<String>) -> Self {
        self.submission.organization_name = Some(name.into());
        self
    }

    pub fn with_newsletter(mut self, newsletter: bool) -> Self {
        self.submission.newsletter = Some(newsletter);
        self
    }

    pub fn with_time(mut self, time: Option<i64>) -> Self {
        self.submission.time = time;
        self
    }

    pub fn with_donation_id(mut self, donation_id: Option<&str>) -> Self {
        self.submission.donation_id = donation_id.map(str::to_string);
        self
    }

    /// Removes all address parts
    pub fn without_address(mut self) -> Self {
        self.submission.take_address();
        self
    }

    pub fn build(self) -> Submission {
        self.submission
    }

    /// Builds the JSON body the webhook would post
    pub fn build_json(self) -> Value {
        json!(self.submission)
    }
}

/// Builder for profiles
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    profile: Profile,
}

impl ProfileBuilder {
    /// Starts from a profile with factory settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            profile: Profile::factory_default(name),
        }
    }

    /// Starts from [`ProfileFixtures::campaign_x`]
    pub fn campaign_x() -> Self {
        Self {
            profile: ProfileFixtures::campaign_x(),
        }
    }

    pub fn with_selector(mut self, selector: &str) -> Self {
        self.profile = self.profile.with_selector(selector);
        self
    }

    pub fn with_campaign(mut self, campaign_id: Option<CampaignId>) -> Self {
        self.profile = self.profile.with_campaign(campaign_id);
        self
    }

    pub fn with_financial_type(mut self, financial_type_id: Option<FinancialTypeId>) -> Self {
        self.profile = self.profile.with_financial_type(financial_type_id);
        self
    }

    pub fn with_groups(mut self, groups: Vec<GroupId>) -> Self {
        self.profile = self.profile.with_groups(groups);
        self
    }

    /// Unsets the instrument a payment method maps to
    pub fn without_payment_method(mut self, method: &str) -> Self {
        let attribute: ProfileAttribute = format!("pi_{}", method)
            .parse()
            .unwrap_or_else(|_| panic!("no payment method {}", method));
        self.profile
            .set_attribute(attribute, &Value::Null)
            .unwrap_or_else(|e| panic!("could not unset {}: {}", attribute, e));
        self
    }

    pub fn build(self) -> Profile {
        self.profile
    }
}
