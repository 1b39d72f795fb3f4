//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating submissions and profiles that
//! satisfy the domain's invariants.

use proptest::prelude::*;

use core_kernel::{Currency, GroupId, Money};
use domain_donation::Submission;
use domain_profile::Profile;

use crate::fixtures::SubmissionFixtures;

/// Strategy for betterplace.org form ids
pub fn form_id_strategy() -> impl Strategy<Value = String> {
    "[A-Z][0-9]{1,5}"
}

/// Strategy for selectors as typed into the editor, with stray spaces
pub fn selector_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    prop::collection::vec(form_id_strategy(), 0..5).prop_map(|ids| {
        let raw = ids.join(" , ");
        (raw, ids)
    })
}

/// Strategy for valid donation amounts in cents
pub fn amount_in_cents_strategy() -> impl Strategy<Value = i64> {
    0i64..100_000_000i64
}

/// Strategy for EUR amounts
pub fn eur_money_strategy() -> impl Strategy<Value = Money> {
    amount_in_cents_strategy().prop_map(|cents| Money::from_minor(cents, Currency::EUR))
}

/// Strategy for the payment methods betterplace.org sends
pub fn payment_method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("creditcard".to_string()),
        Just("paypal".to_string()),
        Just("sepa".to_string()),
    ]
}

/// Strategy for epoch timestamps between 2001 and 2100
pub fn epoch_strategy() -> impl Strategy<Value = i64> {
    1_000_000_000i64..4_102_444_800i64
}

/// Strategy for valid submissions
pub fn submission_strategy() -> impl Strategy<Value = Submission> {
    (
        form_id_strategy(),
        amount_in_cents_strategy(),
        payment_method_strategy(),
        prop::option::of(epoch_strategy()),
        any::<bool>(),
    )
        .prop_map(|(form_id, amount, method, time, newsletter)| Submission {
            form_id,
            amount_in_cents: amount,
            payment_method: method,
            time,
            newsletter: Some(newsletter),
            ..SubmissionFixtures::private_donation()
        })
}

/// Strategy for newsletter group lists
pub fn groups_strategy() -> impl Strategy<Value = Vec<GroupId>> {
    prop::collection::btree_set(1i64..1000, 0..5).prop_map(|ids| {
        ids.into_iter()
            .filter_map(|id| GroupId::new(id).ok())
            .collect()
    })
}

/// Strategy for profiles with factory settings and a random selector
pub fn profile_strategy(name: &'static str) -> impl Strategy<Value = Profile> {
    (selector_strategy(), groups_strategy()).prop_map(move |((raw, _), groups)| {
        Profile::factory_default(name)
            .with_selector(raw.as_str())
            .with_groups(groups)
    })
}
