//! Audit and repair engine
//!
//! Two independent, idempotent passes over the ledger:
//!
//! - the balance audit finds vouchers violating the ledger invariant and
//!   repairs the unambiguous two-leg cases;
//! - the completeness audit finds business records that never produced a
//!   voucher and synthesizes the missing posting.
//!
//! Neither pass aborts on a single bad record: problems are flagged and the
//! scan continues, returning an aggregate report at the end.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use core_kernel::{ActorId, VoucherId};
use infra_store::Store;

use crate::error::LedgerError;
use crate::events::VoucherEventSink;
use crate::poster::{with_retries, JournalPoster};
use crate::repo::{self, collections, AuditAction, SourceIndexDoc};
use crate::source::SourceRecord;
use crate::voucher::{SourceType, Voucher, BALANCE_EPSILON};

/// What the balance audit does with a repairable two-leg imbalance
///
/// Averaging both legs forces balance but can silently change the meaning
/// of a transaction, so the behavior is an explicit policy. The averaging
/// default is kept for compatibility with the historical data this ledger
/// inherits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairPolicy {
    /// Set both legs to the midpoint of the two totals
    #[default]
    TwoLegAveraging,
    /// Never rewrite amounts; flag everything for manual review
    FlagOnly,
}

/// A voucher the balance audit could not (or was not allowed to) repair
#[derive(Debug, Clone)]
pub struct FlaggedVoucher {
    pub voucher_id: VoucherId,
    pub delta: Decimal,
    pub legs: usize,
    pub reason: String,
}

/// Summary of one balance audit run
#[derive(Debug, Default)]
pub struct BalanceAuditReport {
    pub checked: usize,
    pub fixed: usize,
    pub flagged: Vec<FlaggedVoucher>,
}

impl BalanceAuditReport {
    /// Returns true if any voucher needs manual review
    pub fn has_flags(&self) -> bool {
        !self.flagged.is_empty()
    }
}

/// Summary of one completeness audit run
#[derive(Debug, Default)]
pub struct CompletenessAuditReport {
    pub checked: usize,
    pub created: usize,
}

/// Finds and repairs ledger inconsistencies
pub struct AuditEngine {
    store: Store,
    poster: Arc<JournalPoster>,
    policy: RepairPolicy,
    actor: ActorId,
    sinks: Vec<Arc<dyn VoucherEventSink>>,
}

impl AuditEngine {
    /// Creates an audit engine posting repairs as a fresh system actor
    pub fn new(store: Store, poster: Arc<JournalPoster>) -> Self {
        Self {
            store,
            poster,
            policy: RepairPolicy::default(),
            actor: ActorId::new(),
            sinks: Vec::new(),
        }
    }

    /// Sets the repair policy
    pub fn with_policy(mut self, policy: RepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the actor audit-log entries are attributed to
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = actor;
        self
    }

    /// Registers an event sink so repairs adjust the aggregates
    pub fn with_sink(mut self, sink: Arc<dyn VoucherEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Scans every non-deleted voucher for balance violations
    ///
    /// Two-leg imbalances are repaired under `TwoLegAveraging`; everything
    /// else is flagged for manual review. Safe to re-run: repaired vouchers
    /// are balanced on the next pass.
    ///
    /// # Errors
    ///
    /// Only an unrecoverable store failure aborts the run; individual bad
    /// vouchers never do.
    pub async fn run_balance_audit(&self) -> Result<BalanceAuditReport, LedgerError> {
        let vouchers: Vec<(String, Voucher)> = self.store.list(collections::VOUCHERS).await?;
        let mut report = BalanceAuditReport::default();

        for (_, voucher) in vouchers {
            if voucher.is_deleted {
                continue;
            }
            report.checked += 1;

            let delta = voucher.imbalance();
            if delta.abs() < BALANCE_EPSILON {
                continue;
            }

            let two_leg = voucher.debits.len() == 1 && voucher.credits.len() == 1;
            if two_leg && self.policy == RepairPolicy::TwoLegAveraging {
                match with_retries(&self.store, "balance_repair", || self.try_repair(voucher.id))
                    .await
                {
                    Ok(true) => report.fixed += 1,
                    Ok(false) => {} // changed under our feet; the next run re-checks
                    Err(err) => {
                        warn!(voucher_id = %voucher.id, error = %err, "Balance repair failed");
                        report.flagged.push(FlaggedVoucher {
                            voucher_id: voucher.id,
                            delta,
                            legs: voucher.leg_count(),
                            reason: format!("repair failed: {}", err),
                        });
                    }
                }
            } else {
                let reason = if two_leg {
                    "two-leg repair disabled by policy".to_string()
                } else {
                    LedgerError::AmbiguousImbalance {
                        voucher_id: voucher.id,
                        legs: voucher.leg_count(),
                        delta,
                    }
                    .to_string()
                };
                warn!(voucher_id = %voucher.id, delta = %delta, "Voucher flagged for manual review");
                report.flagged.push(FlaggedVoucher {
                    voucher_id: voucher.id,
                    delta,
                    legs: voucher.leg_count(),
                    reason,
                });
            }
        }

        info!(
            checked = report.checked,
            fixed = report.fixed,
            flagged = report.flagged.len(),
            "Balance audit finished"
        );
        Ok(report)
    }

    /// Repairs one two-leg voucher by averaging both legs
    ///
    /// Returns false if the voucher no longer qualifies (deleted, rewritten,
    /// or balanced in the meantime).
    async fn try_repair(&self, voucher_id: VoucherId) -> Result<bool, LedgerError> {
        let mut tx = self.store.begin();

        let before = match repo::load_voucher(&mut tx, voucher_id).await? {
            Some(v) => v,
            None => return Ok(false),
        };
        let delta = before.imbalance();
        if before.is_deleted
            || before.debits.len() != 1
            || before.credits.len() != 1
            || delta.abs() < BALANCE_EPSILON
        {
            return Ok(false);
        }

        let target = (before.debit_total() + before.credit_total()) / dec!(2);
        let mut after = before.clone();
        after.debits[0].amount = target;
        after.credits[0].amount = target;
        after.audit_note = Some(format!(
            "balance audit: averaged legs to {}, original imbalance {}",
            target, delta
        ));

        repo::stage_voucher(&mut tx, &after)?;
        repo::stage_audit(
            &mut tx,
            self.actor,
            AuditAction::BalanceRepaired,
            voucher_id,
            format!("imbalance {} averaged to {}", delta, target),
        )?;

        for sink in &self.sinks {
            sink.on_voucher_updated(&mut tx, &before, &after).await?;
        }

        tx.commit().await?;

        info!(voucher_id = %voucher_id, delta = %delta, "Voucher auto-repaired");
        Ok(true)
    }

    /// Checks that every positive business record produced a voucher
    ///
    /// Missing vouchers are synthesized through the journal poster, so the
    /// run inherits its idempotency: running the audit twice creates
    /// nothing the second time.
    pub async fn run_completeness_audit(
        &self,
        source_types: &[SourceType],
    ) -> Result<CompletenessAuditReport, LedgerError> {
        let records: Vec<(String, SourceRecord)> =
            self.store.list(collections::SOURCE_RECORDS).await?;
        let mut report = CompletenessAuditReport::default();

        for (_, record) in records {
            if !source_types.contains(&record.source_type) {
                continue;
            }
            if record.sale_price <= Decimal::ZERO {
                continue;
            }
            report.checked += 1;

            let key = repo::source_key(record.source_type, &record.source_id);
            let existing: Option<SourceIndexDoc> =
                self.store.get(collections::VOUCHER_SOURCES, &key).await?;
            if existing.is_some() {
                continue;
            }

            let draft = match record.to_draft(self.poster.registry()) {
                Ok(draft) => draft,
                Err(err) => {
                    warn!(source = %key, error = %err, "Cannot synthesize voucher for record");
                    continue;
                }
            };

            match self.poster.post(draft).await {
                Ok(voucher_id) => {
                    info!(source = %key, voucher_id = %voucher_id, "Missing voucher created");
                    report.created += 1;

                    // Separate trail entry marking this as an audit creation
                    let mut tx = self.store.begin();
                    repo::stage_audit(
                        &mut tx,
                        self.actor,
                        AuditAction::MissingVoucherCreated,
                        voucher_id,
                        format!("completeness audit backfilled {}", key),
                    )?;
                    tx.commit().await?;
                }
                Err(err) => {
                    warn!(source = %key, error = %err, "Backfill posting failed");
                }
            }
        }

        info!(
            checked = report.checked,
            created = report.created,
            "Completeness audit finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for AuditEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditEngine")
            .field("policy", &self.policy)
            .finish()
    }
}
