//! Custom Test Assertions
//!
//! Assertion helpers for the bridge's domain types that give more meaningful
//! failure messages than plain `assert_eq!`.

use rust_decimal::Decimal;
use std::str::FromStr;

use domain_donation::{CrmCalls, DonationReceipt};
use domain_profile::StoredProfiles;

/// Asserts the amount of a recorded contribution, in major units
///
/// # Panics
///
/// Panics if `expected` is not a decimal or the amounts differ
pub fn assert_contribution_amount(receipt: &DonationReceipt, expected: &str) {
    let expected = Decimal::from_str(expected)
        .unwrap_or_else(|e| panic!("invalid expected amount {}: {}", expected, e));
    assert_eq!(
        receipt.contribution.total_amount, expected,
        "Contribution amount mismatch: actual={}, expected={}",
        receipt.contribution.total_amount, expected
    );
}

/// Asserts that nothing was recorded as a contribution
pub fn assert_no_contribution(calls: &CrmCalls) {
    assert!(
        calls.contributions.is_empty(),
        "Expected no contribution, got {:?}",
        calls.contributions
    );
}

/// Asserts that exactly one contribution was recorded
pub fn assert_single_contribution(calls: &CrmCalls) {
    assert_eq!(
        calls.contributions.len(),
        1,
        "Expected exactly one contribution, got {:?}",
        calls.contributions
    );
}

/// Asserts that a stored collection holds exactly the given profile names
pub fn assert_stored_names(stored: &StoredProfiles, expected: &[&str]) {
    let actual: Vec<&str> = stored.keys().map(String::as_str).collect();
    let mut expected = expected.to_vec();
    expected.sort_unstable();
    assert_eq!(actual, expected, "Stored profile names mismatch");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assert_stored_names_ignores_order() {
        let mut stored = StoredProfiles::new();
        stored.insert("b".to_string(), json!({}));
        stored.insert("a".to_string(), json!({}));
        assert_stored_names(&stored, &["b", "a"]);
    }

    #[test]
    #[should_panic(expected = "Expected no contribution")]
    fn test_assert_no_contribution_panics() {
        use core_kernel::{ContactId, Currency, FinancialTypeId, Money, PaymentInstrumentId};
        use domain_donation::ContributionRequest;

        let calls = CrmCalls {
            contributions: vec![ContributionRequest {
                contact_id: ContactId::new(1).unwrap(),
                financial_type_id: FinancialTypeId::DONATION,
                payment_instrument_id: PaymentInstrumentId::EFT,
                total_amount: Money::from_minor(100, Currency::EUR),
                trxn_id: None,
                receive_date: None,
                campaign_id: None,
            }],
            ..Default::default()
        };
        assert_no_contribution(&calls);
    }
}
