//! Tests for processing betterplace.org submissions against a mock CRM

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{FinancialTypeId, LocationTypeId, PaymentInstrumentId};
use domain_donation::{
    CrmPort, DonationError, HandlerOptions, MockCrmPort, SubmissionHandler,
};
use domain_profile::{InMemorySettingsStore, Profile, ProfileRegistry};
use test_utils::{
    assert_contribution_amount, assert_no_contribution, assert_single_contribution,
    submission_strategy, ProfileBuilder, ProfileFixtures, SubmissionBuilder, SubmissionFixtures,
};

struct Harness {
    crm: MockCrmPort,
    handler: SubmissionHandler,
}

fn harness(profiles: &[Profile]) -> Harness {
    let mut all = vec![ProfileFixtures::default_profile()];
    all.extend_from_slice(profiles);
    let store = InMemorySettingsStore::with_profiles(ProfileFixtures::stored(&all));
    let registry = Arc::new(ProfileRegistry::new(Arc::new(store)));
    let crm = MockCrmPort::new();
    let port: Arc<dyn CrmPort> = Arc::new(crm.clone());
    Harness {
        handler: SubmissionHandler::new(registry, port, HandlerOptions::default()),
        crm,
    }
}

// ============================================================================
// Private Donation Tests
// ============================================================================

mod private_donation_tests {
    use super::*;

    #[tokio::test]
    async fn test_records_contribution_with_converted_amount() {
        let h = harness(&[]);
        let receipt = h
            .handler
            .submit(SubmissionFixtures::private_donation(), None)
            .await
            .unwrap();

        assert_contribution_amount(&receipt, "10.50");
        assert_eq!(receipt.contribution.currency.as_deref(), Some("EUR"));
        assert_eq!(receipt.contribution.trxn_id.as_deref(), Some("D-1001"));
        assert_eq!(receipt.foreign_id, receipt.contribution.id.get());
        assert_eq!(
            receipt.contribution.receive_date.as_ref().map(|d| d.to_string()).as_deref(),
            Some(SubmissionFixtures::RECEIVE_DATE)
        );
        assert!(receipt.organisation_id.is_none());
        assert!(!receipt.address_shared);

        let calls = h.crm.calls().await;
        assert_single_contribution(&calls);
        let request = &calls.contributions[0];
        assert_eq!(request.contact_id, receipt.contact_id);
        assert_eq!(request.financial_type_id, FinancialTypeId::DONATION);
        assert_eq!(request.payment_instrument_id, PaymentInstrumentId::DEBIT);
        assert!(request.campaign_id.is_none());
    }

    #[tokio::test]
    async fn test_individual_carries_submitted_address() {
        let h = harness(&[]);
        h.handler
            .submit(SubmissionFixtures::private_donation(), None)
            .await
            .unwrap();

        let calls = h.crm.calls().await;
        assert_eq!(calls.contacts.len(), 1);
        let (_, request) = &calls.contacts[0];
        assert_eq!(request.email.as_deref(), Some("jane.doe@example.org"));
        assert_eq!(request.first_name.as_deref(), Some("Jane"));
        assert_eq!(request.address.city.as_deref(), Some("Berlin"));
        assert_eq!(request.location_type_id, Some(LocationTypeId::WORK));
        assert!(calls.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_missing_time_leaves_receive_date_unset() {
        let h = harness(&[]);
        let submission = SubmissionBuilder::new().with_time(None).build();
        let receipt = h.handler.submit(submission, None).await.unwrap();
        assert!(receipt.contribution.receive_date.is_none());
    }

    #[tokio::test]
    async fn test_zero_amount_is_recorded() {
        let h = harness(&[]);
        let submission = SubmissionBuilder::new().with_amount_in_cents(0).build();
        let receipt = h.handler.submit(submission, None).await.unwrap();
        assert_eq!(receipt.contribution.total_amount, dec!(0.00));
    }
}

// ============================================================================
// Profile Selection Tests
// ============================================================================

mod profile_selection_tests {
    use super::*;

    #[tokio::test]
    async fn test_form_selects_campaign_profile() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        let submission = SubmissionBuilder::new().with_form_id("F2").build();
        let receipt = h.handler.submit(submission, None).await.unwrap();
        assert_eq!(
            receipt.contribution.campaign_id,
            Some(ProfileFixtures::campaign_id())
        );
    }

    #[tokio::test]
    async fn test_unknown_form_falls_back_to_default() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        let submission = SubmissionBuilder::new().with_form_id("F3").build();
        let receipt = h.handler.submit(submission, None).await.unwrap();
        assert!(receipt.contribution.campaign_id.is_none());
    }
}

// ============================================================================
// Organisation Tests
// ============================================================================

mod organisation_tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_work_address_replaces_direct_address() {
        let h = harness(&[]);
        let receipt = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap();

        assert!(receipt.address_shared);
        let organisation_id = receipt.organisation_id.unwrap();

        let calls = h.crm.calls().await;
        assert_eq!(calls.contacts.len(), 2);
        let (_, individual) = &calls.contacts[0];
        let (_, organisation) = &calls.contacts[1];
        assert!(individual.address.is_empty());
        assert_eq!(organisation.organization_name.as_deref(), Some("ACME GmbH"));
        assert_eq!(organisation.address.city.as_deref(), Some("Berlin"));
        assert_eq!(calls.shared_addresses, vec![(receipt.contact_id, organisation_id)]);
        assert!(calls.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_missing_work_address_stores_address_directly() {
        let h = harness(&[]);
        h.crm.set_organisation_work_address(false);
        let receipt = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap();

        assert!(!receipt.address_shared);
        let calls = h.crm.calls().await;
        assert_eq!(calls.addresses.len(), 1);
        assert_eq!(calls.addresses[0].contact_id, receipt.contact_id);
        assert_eq!(calls.addresses[0].location_type_id, LocationTypeId::WORK);
        assert_eq!(calls.addresses[0].address.postal_code.as_deref(), Some("10115"));
    }

    #[tokio::test]
    async fn test_failed_sharing_stores_address_directly() {
        let h = harness(&[]);
        h.crm.fail_share(true);
        let receipt = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap();

        assert!(!receipt.address_shared);
        assert_eq!(h.crm.calls().await.addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_donor_keeps_single_shared_address() {
        let h = harness(&[]);
        let first = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap();
        let second = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap();

        assert_eq!(first.contact_id, second.contact_id);
        assert_eq!(first.organisation_id, second.organisation_id);
        assert!(second.address_shared);

        let calls = h.crm.calls().await;
        assert_eq!(calls.contributions.len(), 2);
        assert_eq!(calls.shared_addresses.len(), 1);
        assert!(calls.addresses.is_empty());
    }

    #[tokio::test]
    async fn test_blank_organisation_name_is_ignored() {
        let h = harness(&[]);
        let submission = SubmissionBuilder::new().with_organisation("   ").build();
        let receipt = h.handler.submit(submission, None).await.unwrap();

        assert!(receipt.organisation_id.is_none());
        assert_eq!(h.crm.calls().await.contacts.len(), 1);
    }
}

// ============================================================================
// Failure Tests
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_payment_method_records_nothing() {
        let h = harness(&[]);
        let submission = SubmissionBuilder::new().with_payment_method("bitcoin").build();
        let err = h.handler.submit(submission, None).await.unwrap_err();

        assert!(matches!(err, DonationError::UnknownPaymentMethod(ref m) if m == "bitcoin"));
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Payment method could not be matched to existing payment instrument."
        );
        assert_no_contribution(&h.crm.calls().await);
    }

    #[tokio::test]
    async fn test_unset_payment_instrument_records_nothing() {
        let profile = ProfileBuilder::new("paypal-less")
            .with_selector("F7")
            .without_payment_method("paypal")
            .build();
        let h = harness(&[profile]);
        let submission = SubmissionBuilder::new().with_form_id("F7").build();

        let err = h.handler.submit(submission, None).await.unwrap_err();
        assert!(matches!(err, DonationError::UnknownPaymentMethod(_)));
        assert_no_contribution(&h.crm.calls().await);
    }

    #[tokio::test]
    async fn test_individual_failure_stops_processing() {
        let h = harness(&[]);
        h.crm.fail_individual(true);
        let err = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::IndividualContact(_)));
        assert_eq!(err.to_string(), "Individual contact could not be found or created.");
        let calls = h.crm.calls().await;
        assert!(calls.contacts.is_empty());
        assert_no_contribution(&calls);
    }

    #[tokio::test]
    async fn test_organisation_failure_keeps_individual() {
        let h = harness(&[]);
        h.crm.fail_organisation(true);
        let err = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::OrganisationContact(_)));
        let calls = h.crm.calls().await;
        assert_eq!(calls.contacts.len(), 1);
        assert_no_contribution(&calls);
    }

    #[tokio::test]
    async fn test_address_failure_stops_before_contribution() {
        let h = harness(&[]);
        h.crm.set_organisation_work_address(false);
        h.crm.fail_address(true);
        let err = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::Address(_)));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Address could not be created.");
        let calls = h.crm.calls().await;
        assert_eq!(calls.contacts.len(), 2);
        assert_no_contribution(&calls);
    }

    #[tokio::test]
    async fn test_address_failure_after_failed_share_stops_processing() {
        let h = harness(&[]);
        h.crm.fail_share(true);
        h.crm.fail_address(true);
        let err = h
            .handler
            .submit(SubmissionFixtures::company_donation(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::Address(_)));
        assert_no_contribution(&h.crm.calls().await);
    }

    #[tokio::test]
    async fn test_contribution_failure_skips_groups() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        h.crm.fail_contribution(true);
        let submission = SubmissionBuilder::new().with_newsletter(true).build();

        let err = h.handler.submit(submission, None).await.unwrap_err();
        assert!(matches!(err, DonationError::Contribution(_)));
        assert!(!err.is_client_error());
        assert!(h.crm.calls().await.group_memberships.is_empty());
    }

    #[tokio::test]
    async fn test_missing_financial_type_fails_contribution() {
        let profile = ProfileBuilder::new("no-type")
            .with_selector("F8")
            .with_financial_type(None)
            .build();
        let h = harness(&[profile]);
        let submission = SubmissionBuilder::new().with_form_id("F8").build();

        let err = h.handler.submit(submission, None).await.unwrap_err();
        assert!(matches!(err, DonationError::Contribution(_)));
        assert_no_contribution(&h.crm.calls().await);
    }

    #[tokio::test]
    async fn test_invalid_submission_touches_nothing() {
        let h = harness(&[]);
        let submission = SubmissionBuilder::new().with_email("not-an-email").build();

        let err = h.handler.submit(submission, None).await.unwrap_err();
        assert!(matches!(err, DonationError::Validation(_)));
        assert!(h.crm.calls().await.contacts.is_empty());
    }
}

// ============================================================================
// Newsletter Tests
// ============================================================================

mod newsletter_tests {
    use super::*;

    #[tokio::test]
    async fn test_newsletter_adds_profile_groups() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        let submission = SubmissionBuilder::new().with_newsletter(true).build();
        let receipt = h.handler.submit(submission, None).await.unwrap();

        assert!(receipt.failed_groups.is_empty());
        assert_eq!(
            h.crm.calls().await.group_memberships,
            vec![
                (receipt.contact_id, ProfileFixtures::newsletter_group()),
                (receipt.contact_id, ProfileFixtures::members_group()),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_newsletter_no_groups() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        let submission = SubmissionBuilder::new().with_newsletter(false).build();
        h.handler.submit(submission, None).await.unwrap();
        assert!(h.crm.calls().await.group_memberships.is_empty());
    }

    #[tokio::test]
    async fn test_failing_group_does_not_stop_others() {
        let h = harness(&[ProfileFixtures::campaign_x()]);
        h.crm.fail_group(ProfileFixtures::newsletter_group()).await;
        let submission = SubmissionBuilder::new().with_newsletter(true).build();

        let receipt = h.handler.submit(submission, None).await.unwrap();
        assert_eq!(receipt.failed_groups, vec![ProfileFixtures::newsletter_group()]);
        assert_eq!(
            h.crm.calls().await.group_memberships,
            vec![(receipt.contact_id, ProfileFixtures::members_group())]
        );
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn test_amount_is_cents_divided_by_hundred(submission in submission_strategy()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let cents = submission.amount_in_cents;
        let receipt = runtime.block_on(async {
            harness(&[]).handler.submit(submission, None).await
        }).unwrap();
        prop_assert_eq!(
            receipt.contribution.total_amount,
            rust_decimal::Decimal::new(cents, 2)
        );
    }
}
