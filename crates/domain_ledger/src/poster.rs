//! Journal posting service
//!
//! The transactional heart of the ledger. A post converts a business event
//! into one balanced voucher and persists it atomically together with its
//! entry projections, its idempotency index row, an audit-log entry, and
//! the aggregate deltas staged by the registered event sinks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use core_kernel::{ActorId, Currency, VoucherId};
use infra_store::{backoff_delay, Store};

use crate::account::AccountRef;
use crate::error::LedgerError;
use crate::events::VoucherEventSink;
use crate::registry::AccountRegistry;
use crate::repo::{self, collections, AuditAction, SourceIndexDoc};
use crate::voucher::{EntryLeg, SourceType, VoucherDraft, BALANCE_EPSILON};

/// Posts business events as balanced vouchers
pub struct JournalPoster {
    store: Store,
    registry: Arc<AccountRegistry>,
    sinks: Vec<Arc<dyn VoucherEventSink>>,
}

impl JournalPoster {
    /// Creates a poster over the given store and account registry
    pub fn new(store: Store, registry: Arc<AccountRegistry>) -> Self {
        Self {
            store,
            registry,
            sinks: Vec::new(),
        }
    }

    /// Registers an event sink invoked inside every posting transaction
    pub fn with_sink(mut self, sink: Arc<dyn VoucherEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// The registry this poster validates accounts against
    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    /// Posts a voucher draft
    ///
    /// Idempotent on `(source_type, source_id)`: a retried business action
    /// gets the already-posted voucher id back instead of a duplicate.
    ///
    /// # Errors
    ///
    /// - `EmptyVoucher`, `NegativeAmount`, `UnbalancedEntry` on precondition
    ///   violations, before anything is written
    /// - `UnknownAccount` if a leg references an unregistered account
    /// - `Store` errors once the transaction retry budget is exhausted
    pub async fn post(&self, draft: VoucherDraft) -> Result<VoucherId, LedgerError> {
        draft.validate()?;
        self.check_accounts(draft.debits.iter().chain(draft.credits.iter()))?;

        with_retries(&self.store, "post", || self.try_post(&draft)).await
    }

    /// Convenience two-leg form: one debit account, one credit account
    ///
    /// The company attribution is inferred from whichever side resolves to
    /// a client receivable.
    #[allow(clippy::too_many_arguments)]
    pub async fn post_simple(
        &self,
        source_type: SourceType,
        source_id: impl Into<String>,
        date: DateTime<Utc>,
        currency: Currency,
        amount: Decimal,
        debit_account: &AccountRef,
        credit_account: &AccountRef,
    ) -> Result<VoucherId, LedgerError> {
        let debit = self.registry.resolve(debit_account)?;
        let credit = self.registry.resolve(credit_account)?;

        let mut draft = VoucherDraft::new(source_type, source_id, date, currency)
            .debit(debit, amount)
            .credit(credit, amount);

        if let Some(company) = self
            .registry
            .company_of(debit)
            .or_else(|| self.registry.company_of(credit))
        {
            draft = draft.for_company(company);
        }

        self.post(draft).await
    }

    /// Rewrites a posted voucher's date and/or legs
    ///
    /// Covers business-record edits: a booking moved to another day, or
    /// corrected amounts. The rewrite, its entry projections, the audit-log
    /// entry, and the aggregate month-transition deltas commit together.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the voucher does not exist
    /// - `InvalidTransition` if the voucher is soft-deleted
    /// - `UnbalancedEntry` / `NegativeAmount` / `EmptyVoucher` if the new
    ///   legs violate the invariant
    pub async fn amend(
        &self,
        voucher_id: VoucherId,
        actor: ActorId,
        new_date: Option<DateTime<Utc>>,
        new_legs: Option<(Vec<EntryLeg>, Vec<EntryLeg>)>,
    ) -> Result<(), LedgerError> {
        if let Some((debits, credits)) = &new_legs {
            if debits.is_empty() && credits.is_empty() {
                return Err(LedgerError::EmptyVoucher);
            }
            for leg in debits.iter().chain(credits.iter()) {
                if leg.amount.is_sign_negative() {
                    return Err(LedgerError::NegativeAmount(leg.amount));
                }
            }
            let debit_total: Decimal = debits.iter().map(|l| l.amount).sum();
            let credit_total: Decimal = credits.iter().map(|l| l.amount).sum();
            if (debit_total - credit_total).abs() >= BALANCE_EPSILON {
                return Err(LedgerError::UnbalancedEntry {
                    debits: debit_total,
                    credits: credit_total,
                });
            }
            self.check_accounts(debits.iter().chain(credits.iter()))?;
        }

        with_retries(&self.store, "amend", || {
            self.try_amend(voucher_id, actor, new_date, new_legs.clone())
        })
        .await
    }

    fn check_accounts<'a>(
        &self,
        legs: impl Iterator<Item = &'a EntryLeg>,
    ) -> Result<(), LedgerError> {
        for leg in legs {
            if !self.registry.contains(leg.account_id) {
                return Err(LedgerError::UnknownAccount(leg.account_id.to_string()));
            }
        }
        Ok(())
    }

    async fn try_post(&self, draft: &VoucherDraft) -> Result<VoucherId, LedgerError> {
        let mut tx = self.store.begin();
        let key = repo::source_key(draft.source_type, &draft.source_id);

        if let Some(existing) = tx
            .get::<SourceIndexDoc>(collections::VOUCHER_SOURCES, &key)
            .await?
        {
            info!(
                voucher_id = %existing.voucher_id,
                source = %key,
                "Source already posted, returning existing voucher"
            );
            return Ok(existing.voucher_id);
        }

        let voucher = draft.clone().into_voucher(VoucherId::new_v7(), Utc::now());

        repo::stage_voucher(&mut tx, &voucher)?;
        repo::stage_source_index(&mut tx, &voucher)?;
        repo::stage_audit(
            &mut tx,
            voucher.created_by,
            AuditAction::VoucherPosted,
            voucher.id,
            format!("posted from {}", key),
        )?;

        for sink in &self.sinks {
            sink.on_voucher_created(&mut tx, &voucher).await?;
        }

        tx.commit().await?;

        info!(
            voucher_id = %voucher.id,
            source_type = %voucher.source_type,
            debit_total = %voucher.debit_total(),
            "Voucher posted"
        );
        Ok(voucher.id)
    }

    async fn try_amend(
        &self,
        voucher_id: VoucherId,
        actor: ActorId,
        new_date: Option<DateTime<Utc>>,
        new_legs: Option<(Vec<EntryLeg>, Vec<EntryLeg>)>,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store.begin();

        let before = repo::load_voucher(&mut tx, voucher_id)
            .await?
            .ok_or(LedgerError::NotFound(voucher_id))?;
        if before.is_deleted {
            return Err(LedgerError::InvalidTransition(format!(
                "cannot amend soft-deleted voucher {}",
                voucher_id
            )));
        }

        let mut after = before.clone();
        if let Some(date) = new_date {
            after.date = date;
        }
        if let Some((debits, credits)) = new_legs {
            repo::stage_entry_removal(&mut tx, &before);
            after.debits = debits;
            after.credits = credits;
        }

        repo::stage_voucher(&mut tx, &after)?;
        repo::stage_audit(
            &mut tx,
            actor,
            AuditAction::VoucherAmended,
            after.id,
            format!("date {} -> {}", before.date.date_naive(), after.date.date_naive()),
        )?;

        for sink in &self.sinks {
            sink.on_voucher_updated(&mut tx, &before, &after).await?;
        }

        tx.commit().await?;

        info!(voucher_id = %after.id, "Voucher amended");
        Ok(())
    }
}

/// Runs an operation, retrying transient store failures with backoff
///
/// Safe to apply to every ledger transaction: posts are idempotent on the
/// source key and lifecycle transitions re-check state on each attempt.
pub(crate) async fn with_retries<T, F, Fut>(
    store: &Store,
    operation: &str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LedgerError>>,
{
    let max_attempts = store.config().max_txn_attempts.max(1);
    let base = store.config().retry_base_delay;

    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                debug!(
                    operation,
                    attempt,
                    error = %err,
                    "Transient store failure, retrying"
                );
                tokio::time::sleep(backoff_delay(base, attempt)).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

impl std::fmt::Debug for JournalPoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalPoster")
            .field("accounts", &self.registry.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn poster() -> JournalPoster {
        JournalPoster::new(Store::in_memory(), Arc::new(AccountRegistry::standard()))
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_post_simple_round_trips() {
        let poster = poster();

        let id = poster
            .post_simple(
                SourceType::Remittance,
                "rm-1",
                date(),
                Currency::USD,
                dec!(250),
                &AccountRef::CashBox("main".into()),
                &AccountRef::Clearing("remittances".into()),
            )
            .await
            .unwrap();

        let again = poster
            .post_simple(
                SourceType::Remittance,
                "rm-1",
                date(),
                Currency::USD,
                dec!(250),
                &AccountRef::CashBox("main".into()),
                &AccountRef::Clearing("remittances".into()),
            )
            .await
            .unwrap();

        assert_eq!(id, again);
    }

    #[tokio::test]
    async fn test_post_rejects_unknown_account() {
        let poster = poster();
        let draft = VoucherDraft::new(SourceType::Journal, "j1", date(), Currency::USD)
            .debit(core_kernel::AccountId::new(), dec!(10))
            .credit(core_kernel::AccountId::new(), dec!(10));

        assert!(matches!(
            poster.post(draft).await,
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_post_rejects_unbalanced_before_writing() {
        let poster = poster();
        let registry = poster.registry().clone();
        let cash = registry.resolve(&AccountRef::CashBox("main".into())).unwrap();
        let fees = registry
            .resolve(&AccountRef::RevenueLine("fees".into()))
            .unwrap();

        let draft = VoucherDraft::new(SourceType::Journal, "j2", date(), Currency::USD)
            .debit(cash, dec!(100))
            .credit(fees, dec!(90));

        assert!(matches!(
            poster.post(draft).await,
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    #[tokio::test]
    async fn test_amend_missing_voucher_is_not_found() {
        let poster = poster();
        let result = poster
            .amend(VoucherId::new(), ActorId::new(), Some(date()), None)
            .await;
        assert!(matches!(result, Err(LedgerError::NotFound(_))));
    }
}
