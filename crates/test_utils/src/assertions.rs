//! Custom Test Assertions
//!
//! Specialized assertion helpers for domain types that give more meaningful
//! error messages than bare equality checks.

use rust_decimal::Decimal;

use domain_rollup::PeriodAggregate;
use domain_ledger::Voucher;

/// Asserts that two decimal amounts are equal within a tolerance
///
/// # Panics
///
/// Panics if the amounts differ by `tolerance` or more.
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff < tolerance,
        "amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a voucher satisfies the ledger balance invariant
pub fn assert_voucher_balanced(voucher: &Voucher) {
    assert!(
        voucher.is_balanced(),
        "voucher {} is unbalanced: debits={}, credits={}",
        voucher.id,
        voucher.debit_total(),
        voucher.credit_total()
    );
}

/// Asserts the four fields of a monthly aggregate at once
pub fn assert_aggregate(
    aggregate: &PeriodAggregate,
    revenue: Decimal,
    cost: Decimal,
    profit: Decimal,
    count: i64,
) {
    assert_eq!(
        aggregate.revenue, revenue,
        "revenue mismatch for {} {}",
        aggregate.company_id, aggregate.month
    );
    assert_eq!(
        aggregate.cost, cost,
        "cost mismatch for {} {}",
        aggregate.company_id, aggregate.month
    );
    assert_eq!(
        aggregate.profit, profit,
        "profit mismatch for {} {}",
        aggregate.company_id, aggregate.month
    );
    assert_eq!(
        aggregate.bookings_count, count,
        "count mismatch for {} {}",
        aggregate.company_id, aggregate.month
    );
}

/// Asserts a monthly aggregate carries no contribution at all
pub fn assert_aggregate_zero(aggregate: &PeriodAggregate) {
    assert_aggregate(
        aggregate,
        Decimal::ZERO,
        Decimal::ZERO,
        Decimal::ZERO,
        0,
    );
}
