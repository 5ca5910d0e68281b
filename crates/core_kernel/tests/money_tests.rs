//! Comprehensive unit tests for the Money module
//!
//! Tests cover money creation, arithmetic operations, currency handling,
//! and the approximate-equality tolerance used by the ledger.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_creates_money_with_correct_amount() {
        let m = Money::new(dec!(100.50), Currency::USD);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::USD);
    }

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_minor_converts_cents_correctly() {
        let m = Money::from_minor(10050, Currency::USD);
        assert_eq!(m.amount(), dec!(100.50));
    }

    #[test]
    fn test_from_minor_handles_kwd_three_decimals() {
        let m = Money::from_minor(12345, Currency::KWD);
        assert_eq!(m.amount(), dec!(12.345));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::SAR);
        assert!(m.is_zero());
        assert_eq!(m.currency(), Currency::SAR);
    }

    #[test]
    fn test_negative_amount_creation() {
        let m = Money::new(dec!(-100.00), Currency::USD);
        assert!(m.is_negative());
        assert_eq!(m.amount(), dec!(-100.00));
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_is_zero_true_for_zero_amount() {
        assert!(Money::zero(Currency::USD).is_zero());
    }

    #[test]
    fn test_is_positive_false_for_zero() {
        assert!(!Money::zero(Currency::USD).is_positive());
    }

    #[test]
    fn test_is_positive_true_for_positive_amount() {
        assert!(Money::new(dec!(0.01), Currency::USD).is_positive());
    }

    #[test]
    fn test_abs_flips_negative_amounts() {
        let m = Money::new(dec!(-45.50), Currency::AED);
        assert_eq!(m.abs().amount(), dec!(45.50));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_add_same_currency() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(50.25), Currency::USD);
        assert_eq!((a + b).amount(), dec!(150.25));
    }

    #[test]
    fn test_sub_same_currency() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(50.25), Currency::USD);
        assert_eq!((a - b).amount(), dec!(49.75));
    }

    #[test]
    fn test_neg_flips_sign() {
        let a = Money::new(dec!(75.00), Currency::EGP);
        assert_eq!((-a).amount(), dec!(-75.00));
    }

    #[test]
    fn test_checked_add_rejects_currency_mismatch() {
        let usd = Money::new(dec!(100.00), Currency::USD);
        let eur = Money::new(dec!(100.00), Currency::EUR);

        assert!(matches!(
            usd.checked_add(&eur),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_checked_sub_rejects_currency_mismatch() {
        let usd = Money::new(dec!(100.00), Currency::USD);
        let try_ = Money::new(dec!(100.00), Currency::TRY);

        assert!(matches!(
            usd.checked_sub(&try_),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }
}

mod tolerance {
    use super::*;

    #[test]
    fn test_approx_eq_inside_ledger_epsilon() {
        let a = Money::new(dec!(500.0002), Currency::USD);
        let b = Money::new(dec!(500.0000), Currency::USD);

        assert!(a.approx_eq(&b, dec!(0.001)));
    }

    #[test]
    fn test_approx_eq_outside_ledger_epsilon() {
        let a = Money::new(dec!(500.002), Currency::USD);
        let b = Money::new(dec!(500.000), Currency::USD);

        assert!(!a.approx_eq(&b, dec!(0.001)));
    }

    #[test]
    fn test_approx_eq_is_exclusive_at_boundary() {
        let a = Money::new(dec!(500.001), Currency::USD);
        let b = Money::new(dec!(500.000), Currency::USD);

        assert!(!a.approx_eq(&b, dec!(0.001)));
    }
}

mod display {
    use super::*;

    #[test]
    fn test_display_uses_currency_symbol_and_places() {
        let m = Money::new(dec!(1234.5), Currency::USD);
        assert_eq!(m.to_string(), "$ 1234.50");
    }

    #[test]
    fn test_display_three_decimal_currency() {
        let m = Money::new(dec!(12.3), Currency::JOD);
        assert_eq!(m.to_string(), "JD 12.300");
    }

    #[test]
    fn test_round_to_currency() {
        let m = Money::new(dec!(10.2345), Currency::USD);
        assert_eq!(m.round_to_currency().amount(), dec!(10.23));
    }
}
