//! Donation Domain Ports
//!
//! The submission handler records donations through [`CrmPort`]. The
//! production adapter talks to CiviCRM over its REST API (see
//! [`crate::adapters`]); tests use the recording [`mock::MockCrmPort`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_donation::{CrmPort, SubmissionHandler};
//! use std::sync::Arc;
//!
//! let crm: Arc<dyn CrmPort> = Arc::new(CiviCrmAdapter::new(config)?);
//! let handler = SubmissionHandler::new(registry, crm, HandlerOptions::default());
//! ```

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use core_kernel::{
    AddressId, CampaignId, ContactId, ContributionId, CrmDateTime, DomainPort,
    FinancialTypeId, GroupId, HealthCheckable, LocationTypeId, Money, OperationMetadata,
    PaymentInstrumentId, PortError,
};

use crate::submission::AddressFields;

/// CiviCRM contact types the bridge creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContactType {
    Individual,
    Organization,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Individual => "Individual",
            ContactType::Organization => "Organization",
        }
    }
}

/// Data for matching an existing contact or creating a new one
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRequest {
    pub contact_type: ContactType,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub organization_name: Option<String>,
    pub address: AddressFields,
    /// Location type for the address and e-mail, if any
    pub location_type_id: Option<LocationTypeId>,
}

impl ContactRequest {
    /// Creates an empty request for the given contact type
    pub fn new(contact_type: ContactType) -> Self {
        Self {
            contact_type,
            first_name: None,
            last_name: None,
            email: None,
            organization_name: None,
            address: AddressFields::default(),
            location_type_id: None,
        }
    }
}

/// Request for creating an address on a contact
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRequest {
    pub contact_id: ContactId,
    pub location_type_id: LocationTypeId,
    pub address: AddressFields,
}

/// Request for creating a contribution
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionRequest {
    pub contact_id: ContactId,
    pub financial_type_id: FinancialTypeId,
    pub payment_instrument_id: PaymentInstrumentId,
    pub total_amount: Money,
    pub trxn_id: Option<String>,
    pub receive_date: Option<CrmDateTime>,
    pub campaign_id: Option<CampaignId>,
}

/// A contribution as recorded by the CRM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub contact_id: ContactId,
    pub financial_type_id: Option<FinancialTypeId>,
    pub payment_instrument_id: Option<PaymentInstrumentId>,
    /// Amount in major units
    pub total_amount: Decimal,
    pub currency: Option<String>,
    pub trxn_id: Option<String>,
    pub receive_date: Option<CrmDateTime>,
    pub campaign_id: Option<CampaignId>,
}

/// Operations the donation domain needs from the CRM
#[async_trait]
pub trait CrmPort: DomainPort + HealthCheckable {
    /// Finds the contact matching the request, creating it if none matches
    async fn get_or_create_contact(
        &self,
        request: ContactRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<ContactId, PortError>;

    /// Shares the organisation's work address with an individual
    ///
    /// # Returns
    ///
    /// `false` if the organisation has no work address to share
    async fn share_work_address(
        &self,
        contact_id: ContactId,
        organisation_id: ContactId,
        metadata: Option<OperationMetadata>,
    ) -> Result<bool, PortError>;

    /// Creates an address on a contact
    async fn create_address(
        &self,
        request: AddressRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<AddressId, PortError>;

    /// Records a contribution
    async fn create_contribution(
        &self,
        request: ContributionRequest,
        metadata: Option<OperationMetadata>,
    ) -> Result<Contribution, PortError>;

    /// Adds a contact to a group
    async fn add_to_group(
        &self,
        contact_id: ContactId,
        group_id: GroupId,
        metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError>;
}

/// Mock implementation of CrmPort for testing
///
/// Records every call so tests can assert on what would have been written
/// to the CRM, and can be told to fail individual operations. Contacts are
/// matched like the CRM's contact matcher would: individuals by e-mail,
/// organisations by name. A donor already sharing an organisation's address
/// is not linked twice.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, HealthCheckResult};

    /// Everything written through the mock
    #[derive(Debug, Clone, Default)]
    pub struct CrmCalls {
        /// Contacts created, matched contacts are not repeated
        pub contacts: Vec<(ContactId, ContactRequest)>,
        pub shared_addresses: Vec<(ContactId, ContactId)>,
        pub addresses: Vec<AddressRequest>,
        pub contributions: Vec<ContributionRequest>,
        pub group_memberships: Vec<(ContactId, GroupId)>,
    }

    /// In-memory, recording CRM
    #[derive(Debug, Clone)]
    pub struct MockCrmPort {
        calls: Arc<RwLock<CrmCalls>>,
        next_id: Arc<AtomicI64>,
        fail_individual: Arc<AtomicBool>,
        fail_organisation: Arc<AtomicBool>,
        fail_share: Arc<AtomicBool>,
        organisation_has_work_address: Arc<AtomicBool>,
        fail_address: Arc<AtomicBool>,
        fail_contribution: Arc<AtomicBool>,
        failing_groups: Arc<RwLock<HashSet<GroupId>>>,
    }

    impl Default for MockCrmPort {
        fn default() -> Self {
            Self {
                calls: Arc::default(),
                next_id: Arc::new(AtomicI64::new(100)),
                fail_individual: Arc::default(),
                fail_organisation: Arc::default(),
                fail_share: Arc::default(),
                organisation_has_work_address: Arc::new(AtomicBool::new(true)),
                fail_address: Arc::default(),
                fail_contribution: Arc::default(),
                failing_groups: Arc::default(),
            }
        }
    }

    impl MockCrmPort {
        /// Creates a mock where every operation succeeds
        pub fn new() -> Self {
            Self::default()
        }

        /// Returns a copy of the recorded calls
        pub async fn calls(&self) -> CrmCalls {
            self.calls.read().await.clone()
        }

        pub fn fail_individual(&self, fail: bool) {
            self.fail_individual.store(fail, Ordering::SeqCst);
        }

        pub fn fail_organisation(&self, fail: bool) {
            self.fail_organisation.store(fail, Ordering::SeqCst);
        }

        /// Makes address sharing return an error
        pub fn fail_share(&self, fail: bool) {
            self.fail_share.store(fail, Ordering::SeqCst);
        }

        /// Controls whether organisations have a work address to share
        pub fn set_organisation_work_address(&self, present: bool) {
            self.organisation_has_work_address.store(present, Ordering::SeqCst);
        }

        /// Makes creating an address on a contact fail
        pub fn fail_address(&self, fail: bool) {
            self.fail_address.store(fail, Ordering::SeqCst);
        }

        pub fn fail_contribution(&self, fail: bool) {
            self.fail_contribution.store(fail, Ordering::SeqCst);
        }

        /// Makes adding contacts to the given group fail
        pub async fn fail_group(&self, group_id: GroupId) {
            self.failing_groups.write().await.insert(group_id);
        }

        fn next_id(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn same_contact(known: &ContactRequest, request: &ContactRequest) -> bool {
        if known.contact_type != request.contact_type {
            return false;
        }
        let key = |r: &ContactRequest| match r.contact_type {
            ContactType::Individual => r.email.clone(),
            ContactType::Organization => r.organization_name.clone(),
        };
        key(request).is_some() && key(known) == key(request)
    }

    impl DomainPort for MockCrmPort {}

    #[async_trait]
    impl HealthCheckable for MockCrmPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::now(
                "mock-crm-port",
                AdapterHealth::Healthy,
                0,
                Some("Mock adapter always healthy".to_string()),
            )
        }
    }

    #[async_trait]
    impl CrmPort for MockCrmPort {
        async fn get_or_create_contact(
            &self,
            request: ContactRequest,
            _metadata: Option<OperationMetadata>,
        ) -> Result<ContactId, PortError> {
            let fail = match request.contact_type {
                ContactType::Individual => &self.fail_individual,
                ContactType::Organization => &self.fail_organisation,
            };
            if fail.load(Ordering::SeqCst) {
                return Err(PortError::validation("contact matcher rejected the contact"));
            }

            let mut calls = self.calls.write().await;
            if let Some((id, _)) = calls.contacts.iter().find(|(_, known)| same_contact(known, &request)) {
                return Ok(*id);
            }
            let id = ContactId::new(self.next_id()).map_err(|e| PortError::transformation(e.to_string()))?;
            calls.contacts.push((id, request));
            Ok(id)
        }

        async fn share_work_address(
            &self,
            contact_id: ContactId,
            organisation_id: ContactId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<bool, PortError> {
            if self.fail_share.load(Ordering::SeqCst) {
                return Err(PortError::connection("address sharing failed"));
            }
            if !self.organisation_has_work_address.load(Ordering::SeqCst) {
                return Ok(false);
            }
            let mut calls = self.calls.write().await;
            let link = (contact_id, organisation_id);
            if !calls.shared_addresses.contains(&link) {
                calls.shared_addresses.push(link);
            }
            Ok(true)
        }

        async fn create_address(
            &self,
            request: AddressRequest,
            _metadata: Option<OperationMetadata>,
        ) -> Result<AddressId, PortError> {
            if self.fail_address.load(Ordering::SeqCst) {
                return Err(PortError::validation("address rejected"));
            }
            let id = AddressId::new(self.next_id()).map_err(|e| PortError::transformation(e.to_string()))?;
            self.calls.write().await.addresses.push(request);
            Ok(id)
        }

        async fn create_contribution(
            &self,
            request: ContributionRequest,
            _metadata: Option<OperationMetadata>,
        ) -> Result<Contribution, PortError> {
            if self.fail_contribution.load(Ordering::SeqCst) {
                return Err(PortError::validation("contribution rejected"));
            }

            let id = ContributionId::new(self.next_id()).map_err(|e| PortError::transformation(e.to_string()))?;
            let contribution = Contribution {
                id,
                contact_id: request.contact_id,
                financial_type_id: Some(request.financial_type_id),
                payment_instrument_id: Some(request.payment_instrument_id),
                total_amount: request.total_amount.amount(),
                currency: Some(request.total_amount.currency().code().to_string()),
                trxn_id: request.trxn_id.clone(),
                receive_date: request.receive_date,
                campaign_id: request.campaign_id,
            };
            self.calls.write().await.contributions.push(request);
            Ok(contribution)
        }

        async fn add_to_group(
            &self,
            contact_id: ContactId,
            group_id: GroupId,
            _metadata: Option<OperationMetadata>,
        ) -> Result<(), PortError> {
            if self.failing_groups.read().await.contains(&group_id) {
                return Err(PortError::not_found("Group", group_id));
            }
            self.calls
                .write()
                .await
                .group_memberships
                .push((contact_id, group_id));
            Ok(())
        }
    }
}
