//! Property-Based Test Generators
//!
//! Proptest strategies for generating random test data that maintains
//! domain invariants.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Currency;
use domain_ledger::SourceType;

/// Strategy for generating ledger currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::SAR),
        Just(Currency::AED),
        Just(Currency::EGP),
    ]
}

/// Strategy for generating any source type
pub fn source_type_strategy() -> impl Strategy<Value = SourceType> {
    prop_oneof![
        Just(SourceType::Booking),
        Just(SourceType::Visa),
        Just(SourceType::Subscription),
        Just(SourceType::Expense),
        Just(SourceType::Payment),
        Just(SourceType::StandardReceipt),
        Just(SourceType::DistributedReceipt),
        Just(SourceType::Journal),
        Just(SourceType::Remittance),
        Just(SourceType::Segment),
    ]
}

/// Strategy for the source types that count toward bookings
pub fn eligible_source_type_strategy() -> impl Strategy<Value = SourceType> {
    prop_oneof![
        Just(SourceType::Booking),
        Just(SourceType::Visa),
        Just(SourceType::Subscription),
    ]
}

/// Strategy for positive amounts with two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|minor| Decimal::new(minor, 2))
}

/// Strategy for a balanced pair of debit and credit amount lists
///
/// The debit side is a random split; the credit side is one leg carrying
/// the same total, so any voucher built from the pair satisfies the ledger
/// invariant by construction.
pub fn balanced_amounts_strategy() -> impl Strategy<Value = (Vec<Decimal>, Vec<Decimal>)> {
    proptest::collection::vec(amount_strategy(), 1..6)
        .prop_map(|debits| {
            let total: Decimal = debits.iter().sum();
            (debits, vec![total])
        })
}
