//! Aggregation event sink
//!
//! Translates voucher lifecycle events into signed deltas against the
//! per-company monthly aggregates, inside the same transaction as the
//! voucher write. Classification is by account group: credit legs against
//! revenue accounts are revenue, debit legs against expense accounts are
//! cost, profit is their difference, and every other account group
//! contributes nothing to the rollups.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::trace;

use core_kernel::{CompanyId, MonthId};
use infra_store::Transaction;

use domain_ledger::{
    AccountGroup, AccountRegistry, EntrySide, LedgerError, Voucher, VoucherEventSink,
};

use crate::period::{PeriodAggregator, PeriodDeltas};

/// Routes voucher contributions into the monthly rollups
pub struct AggregationSink {
    aggregator: PeriodAggregator,
    registry: Arc<AccountRegistry>,
}

impl AggregationSink {
    /// Creates a sink over the given aggregator and account registry
    pub fn new(aggregator: PeriodAggregator, registry: Arc<AccountRegistry>) -> Self {
        Self {
            aggregator,
            registry,
        }
    }

    /// The signed aggregate contribution of one voucher
    ///
    /// Revenue is credits minus debits against revenue-group accounts, cost
    /// is debits minus credits against expense-group accounts, and the
    /// bookings count is 1 for eligible source types. Unclassified accounts
    /// contribute zero while still posting to the ledger.
    pub fn contribution(&self, voucher: &Voucher) -> PeriodDeltas {
        let mut revenue = Decimal::ZERO;
        let mut cost = Decimal::ZERO;

        for (side, leg) in voucher.legs() {
            match (self.registry.group_of(leg.account_id), side) {
                (Some(AccountGroup::Revenue), EntrySide::Credit) => revenue += leg.amount,
                (Some(AccountGroup::Revenue), EntrySide::Debit) => revenue -= leg.amount,
                (Some(AccountGroup::Expense), EntrySide::Debit) => cost += leg.amount,
                (Some(AccountGroup::Expense), EntrySide::Credit) => cost -= leg.amount,
                _ => {}
            }
        }

        PeriodDeltas {
            revenue,
            cost,
            profit: revenue - cost,
            count: i64::from(voucher.source_type.counts_toward_bookings()),
        }
    }

    fn placement(&self, voucher: &Voucher) -> Option<(CompanyId, MonthId)> {
        let company = voucher.company_id?;
        Some((company, self.aggregator.month_of(voucher.date)))
    }
}

#[async_trait]
impl VoucherEventSink for AggregationSink {
    async fn on_voucher_created(
        &self,
        tx: &mut Transaction,
        voucher: &Voucher,
    ) -> Result<(), LedgerError> {
        let Some((company, month)) = self.placement(voucher) else {
            trace!(voucher_id = %voucher.id, "Voucher has no company, skipping rollup");
            return Ok(());
        };
        self.aggregator
            .apply_in(tx, company, month, &self.contribution(voucher));
        Ok(())
    }

    async fn on_voucher_updated(
        &self,
        tx: &mut Transaction,
        before: &Voucher,
        after: &Voucher,
    ) -> Result<(), LedgerError> {
        let old = self.placement(before).map(|p| (p, self.contribution(before)));
        let new = self.placement(after).map(|p| (p, self.contribution(after)));

        match (old, new) {
            // Same company and month: one net delta, never a
            // subtract-then-add pair that readers could observe in between.
            (Some((old_key, old_deltas)), Some((new_key, new_deltas))) if old_key == new_key => {
                let (company, month) = new_key;
                self.aggregator
                    .apply_in(tx, company, month, &(new_deltas - old_deltas));
            }
            // Month or company changed: move the contribution wholesale.
            (old, new) => {
                if let Some(((company, month), deltas)) = old {
                    self.aggregator.apply_in(tx, company, month, &(-deltas));
                }
                if let Some(((company, month), deltas)) = new {
                    self.aggregator.apply_in(tx, company, month, &deltas);
                }
            }
        }
        Ok(())
    }

    async fn on_voucher_deleted(
        &self,
        tx: &mut Transaction,
        voucher: &Voucher,
    ) -> Result<(), LedgerError> {
        let Some((company, month)) = self.placement(voucher) else {
            return Ok(());
        };
        self.aggregator
            .apply_in(tx, company, month, &(-self.contribution(voucher)));
        Ok(())
    }
}

impl std::fmt::Debug for AggregationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationSink")
            .field("accounts", &self.registry.len())
            .finish()
    }
}
