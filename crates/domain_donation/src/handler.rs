//! Submission handler
//!
//! Turns one betterplace.org submission into CRM records:
//!
//! 1. pick the profile responsible for the submission's form
//! 2. match or create the donor, and their organisation if one was given
//! 3. share the organisation's work address with the donor, or store the
//!    submitted address directly when that is not possible
//! 4. record the contribution
//! 5. sign the donor up for the profile's newsletter groups on request
//!
//! Nothing is rolled back. A failure after contacts were created leaves
//! them in place.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use core_kernel::{
    ContactId, CrmDateTime, Currency, GroupId, LocationTypeId, Money, OperationMetadata,
    Timezone,
};
use domain_profile::{Profile, ProfileRegistry};

use crate::error::DonationError;
use crate::ports::{
    AddressRequest, ContactRequest, ContactType, Contribution, ContributionRequest, CrmPort,
};
use crate::submission::{AddressFields, Submission};

/// Settings applied to every submission
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerOptions {
    /// Currency of `amount_in_cents`
    pub currency: Currency,
    /// Time zone of the CRM site, used for the receive date
    pub timezone: Timezone,
}

/// Outcome of a successfully processed submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationReceipt {
    pub contribution: Contribution,
    /// Id reported back to betterplace.org
    pub foreign_id: i64,
    pub contact_id: ContactId,
    pub organisation_id: Option<ContactId>,
    pub address_shared: bool,
    /// Groups the donor could not be added to
    pub failed_groups: Vec<GroupId>,
}

/// Processes donation submissions
pub struct SubmissionHandler {
    registry: Arc<ProfileRegistry>,
    crm: Arc<dyn CrmPort>,
    options: HandlerOptions,
}

impl std::fmt::Debug for SubmissionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionHandler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SubmissionHandler {
    pub fn new(registry: Arc<ProfileRegistry>, crm: Arc<dyn CrmPort>, options: HandlerOptions) -> Self {
        Self {
            registry,
            crm,
            options,
        }
    }

    /// Records one submission in the CRM
    ///
    /// # Errors
    ///
    /// Fails without recording a contribution when the submission is invalid,
    /// a contact or the submitted address cannot be stored, or the payment
    /// method is not mapped by the profile. Fails after contacts were written when the contribution
    /// itself cannot be created.
    #[instrument(skip(self, submission, metadata), fields(form_id = %submission.form_id))]
    pub async fn submit(
        &self,
        mut submission: Submission,
        metadata: Option<OperationMetadata>,
    ) -> Result<DonationReceipt, DonationError> {
        submission.check()?;

        let profile = self.registry.profile_for_form(&submission.form_id).await?;
        info!(profile = %profile.name(), "Processing betterplace.org donation");

        // With an organisation the address belongs to the organisation.
        let organisation_name = submission.organisation().map(str::to_string);
        let set_aside = match organisation_name {
            Some(_) => submission.take_address(),
            None => AddressFields::default(),
        };

        let contact_id = self
            .crm
            .get_or_create_contact(individual_request(&submission, &profile), metadata.clone())
            .await
            .map_err(|error| {
                warn!(%error, "Individual contact lookup failed");
                DonationError::IndividualContact(error)
            })?;

        let organisation_id = match organisation_name {
            Some(name) => {
                let mut request = ContactRequest::new(ContactType::Organization);
                request.organization_name = Some(name);
                request.address = set_aside.clone();
                let id = self
                    .crm
                    .get_or_create_contact(request, metadata.clone())
                    .await
                    .map_err(|error| {
                        warn!(%error, "Organisation contact lookup failed");
                        DonationError::OrganisationContact(error)
                    })?;
                Some(id)
            }
            None => None,
        };

        let address_shared = match organisation_id {
            Some(organisation_id) => {
                match self
                    .crm
                    .share_work_address(contact_id, organisation_id, metadata.clone())
                    .await
                {
                    Ok(shared) => shared,
                    Err(error) => {
                        warn!(%error, %contact_id, %organisation_id, "Could not share work address");
                        false
                    }
                }
            }
            None => false,
        };

        if !address_shared && !set_aside.is_empty() {
            let request = AddressRequest {
                contact_id,
                location_type_id: LocationTypeId::WORK,
                address: set_aside,
            };
            self.crm
                .create_address(request, metadata.clone())
                .await
                .map_err(|error| {
                    warn!(%error, %contact_id, "Could not create submitted address");
                    DonationError::Address(error)
                })?;
        }

        let payment_instrument_id = profile
            .payment_instrument(&submission.payment_method)
            .ok_or_else(|| DonationError::UnknownPaymentMethod(submission.payment_method.clone()))?;

        let financial_type_id = profile
            .financial_type_id()
            .ok_or_else(|| DonationError::contribution("profile has no financial type"))?;

        let receive_date = submission
            .time
            .map(|time| CrmDateTime::from_epoch(time, self.options.timezone))
            .transpose()
            .map_err(|e| DonationError::validation(e.to_string()))?;

        let request = ContributionRequest {
            contact_id,
            financial_type_id,
            payment_instrument_id,
            total_amount: Money::from_minor(submission.amount_in_cents, self.options.currency),
            trxn_id: submission.donation_id.clone(),
            receive_date,
            campaign_id: profile.campaign_id(),
        };

        let contribution = self
            .crm
            .create_contribution(request, metadata.clone())
            .await
            .map_err(|error| {
                warn!(%error, "Contribution could not be created");
                DonationError::contribution(error)
            })?;

        let mut failed_groups = Vec::new();
        if submission.wants_newsletter() {
            for &group_id in profile.groups() {
                if let Err(error) = self.crm.add_to_group(contact_id, group_id, metadata.clone()).await {
                    warn!(%error, %group_id, %contact_id, "Could not add contact to group");
                    failed_groups.push(group_id);
                }
            }
        }

        info!(contribution_id = %contribution.id, %contact_id, "Donation recorded");

        Ok(DonationReceipt {
            foreign_id: contribution.id.get(),
            contribution,
            contact_id,
            organisation_id,
            address_shared,
            failed_groups,
        })
    }
}

fn individual_request(submission: &Submission, profile: &Profile) -> ContactRequest {
    let address = submission.address();
    ContactRequest {
        first_name: submission.first_name.clone(),
        last_name: submission.last_name.clone(),
        email: Some(submission.email.clone()),
        location_type_id: profile.location_type_id(),
        address,
        ..ContactRequest::new(ContactType::Individual)
    }
}
