//! Property-based tests for request validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::validation::{validate_amount, validate_description, validate_idempotency_key};

/// Amounts with up to four decimal places, from 0.0001 to 1,000,000.0000.
fn fine_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000_000i64).prop_map(|units| Decimal::new(units, 4))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Accepted amounts always carry exactly two decimal places and are positive.
    #[test]
    fn prop_accepted_amount_is_positive_cents(amount in fine_amount()) {
        match validate_amount(amount) {
            Ok(money) => {
                prop_assert!(money.is_positive());
                prop_assert_eq!(money.amount().scale(), 2);
                prop_assert!((money.amount() - amount).abs() <= Decimal::new(5, 3));
            }
            Err(err) => {
                prop_assert!(matches!(err, LedgerError::ZeroAmount));
                prop_assert!(amount <= Decimal::new(5, 3));
            }
        }
    }

    /// Whole-cent amounts are accepted up to the largest storable value and rejected above it.
    #[test]
    fn prop_amount_ceiling(cents in 1u64..=u64::MAX) {
        let amount = Decimal::from_i128_with_scale(i128::from(cents), 2);
        match validate_amount(amount) {
            Ok(money) => {
                prop_assert!(cents <= 9_999_999_999_999_999_999);
                prop_assert_eq!(money.amount(), amount);
            }
            Err(err) => {
                prop_assert!(cents > 9_999_999_999_999_999_999);
                prop_assert!(matches!(err, LedgerError::AmountTooLarge { .. }), "unexpected error: {:?}", err);
            }
        }
    }

    /// Negative amounts are never accepted.
    #[test]
    fn prop_negative_amount_rejected(amount in fine_amount()) {
        prop_assert!(matches!(validate_amount(-amount), Err(LedgerError::NegativeAmount)));
    }

    /// Description length limit is measured in characters, after trimming.
    #[test]
    fn prop_description_limit(text in "[a-zé ]{0,40}", max in 1usize..30) {
        let trimmed = text.trim();
        let result = validate_description(Some(&text), max);
        if trimmed.chars().count() > max {
            let rejected = matches!(result, Err(LedgerError::DescriptionTooLong { .. }));
            prop_assert!(rejected);
        } else {
            let accepted = result.unwrap();
            prop_assert_eq!(accepted.as_deref().unwrap_or(""), trimmed);
        }
    }

    /// Printable ASCII keys within the length limit are accepted verbatim.
    #[test]
    fn prop_idempotency_key_accepted(key in "[!-~]{1,128}") {
        let accepted = validate_idempotency_key(Some(&key)).unwrap();
        prop_assert_eq!(accepted.as_deref(), Some(key.as_str()));
    }
}
