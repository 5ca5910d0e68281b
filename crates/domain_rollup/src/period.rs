//! Per-company monthly aggregates
//!
//! Each (company, month) pair owns four sharded counters: revenue, cost,
//! profit, and bookings count. Aggregates are created lazily on first
//! increment and never deleted; deleting a voucher decrements them back
//! toward zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::ops::{Neg, Sub};
use tracing::debug;

use core_kernel::{CompanyId, MonthId, Timezone};
use infra_store::{StoreError, Transaction};

use crate::counter::ShardedCounter;

/// Signed contribution of one voucher to a monthly aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodDeltas {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub count: i64,
}

impl PeriodDeltas {
    /// Returns true if applying this delta would change nothing
    pub fn is_zero(&self) -> bool {
        self.revenue.is_zero() && self.cost.is_zero() && self.profit.is_zero() && self.count == 0
    }
}

impl Neg for PeriodDeltas {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            revenue: -self.revenue,
            cost: -self.cost,
            profit: -self.profit,
            count: -self.count,
        }
    }
}

impl Sub for PeriodDeltas {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            revenue: self.revenue - other.revenue,
            cost: self.cost - other.cost,
            profit: self.profit - other.profit,
            count: self.count - other.count,
        }
    }
}

/// Snapshot of one (company, month) rollup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodAggregate {
    pub company_id: CompanyId,
    pub month: MonthId,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub bookings_count: i64,
}

/// Maintains the per-company monthly rollups
#[derive(Debug, Clone)]
pub struct PeriodAggregator {
    counter: ShardedCounter,
    timezone: Timezone,
}

impl PeriodAggregator {
    /// Creates an aggregator bucketing months in the given business timezone
    pub fn new(counter: ShardedCounter, timezone: Timezone) -> Self {
        Self { counter, timezone }
    }

    /// The month a voucher dated at this instant belongs to
    pub fn month_of(&self, at: chrono::DateTime<chrono::Utc>) -> MonthId {
        MonthId::from_datetime(at, &self.timezone)
    }

    fn key(company: CompanyId, field: &str, month: MonthId) -> String {
        format!("{}_{}_{}", company.as_uuid(), field, month)
    }

    /// Applies a signed delta to one (company, month) aggregate
    pub async fn apply(
        &self,
        company: CompanyId,
        month: MonthId,
        deltas: &PeriodDeltas,
    ) -> Result<(), StoreError> {
        if deltas.is_zero() {
            return Ok(());
        }
        debug!(company = %company, month = %month, ?deltas, "Applying aggregate deltas");
        self.counter
            .increment(&Self::key(company, "revenue", month), deltas.revenue)
            .await?;
        self.counter
            .increment(&Self::key(company, "cost", month), deltas.cost)
            .await?;
        self.counter
            .increment(&Self::key(company, "profit", month), deltas.profit)
            .await?;
        self.counter
            .increment(
                &Self::key(company, "count", month),
                Decimal::from(deltas.count),
            )
            .await?;
        Ok(())
    }

    /// Stages the same deltas into a caller-owned transaction
    ///
    /// Used by the voucher event sinks so the aggregate update commits
    /// atomically with the voucher write that caused it.
    pub fn apply_in(
        &self,
        tx: &mut Transaction,
        company: CompanyId,
        month: MonthId,
        deltas: &PeriodDeltas,
    ) {
        if deltas.is_zero() {
            return;
        }
        debug!(company = %company, month = %month, ?deltas, "Staging aggregate deltas");
        self.counter
            .increment_in(tx, &Self::key(company, "revenue", month), deltas.revenue);
        self.counter
            .increment_in(tx, &Self::key(company, "cost", month), deltas.cost);
        self.counter
            .increment_in(tx, &Self::key(company, "profit", month), deltas.profit);
        self.counter.increment_in(
            tx,
            &Self::key(company, "count", month),
            Decimal::from(deltas.count),
        );
    }

    /// Reads one (company, month) aggregate
    ///
    /// Sums each field's shards; a concurrent writer may be partially
    /// visible, which is the documented eventual-consistency trade-off.
    pub async fn get(
        &self,
        company: CompanyId,
        month: MonthId,
    ) -> Result<PeriodAggregate, StoreError> {
        let revenue = self.counter.read(&Self::key(company, "revenue", month)).await?;
        let cost = self.counter.read(&Self::key(company, "cost", month)).await?;
        let profit = self.counter.read(&Self::key(company, "profit", month)).await?;
        let count = self.counter.read(&Self::key(company, "count", month)).await?;

        Ok(PeriodAggregate {
            company_id: company,
            month,
            revenue,
            cost,
            profit,
            bookings_count: count.to_i64().unwrap_or_default(),
        })
    }
}
