//! Persistence layout and staging helpers
//!
//! The ledger lives in a handful of document collections. This module owns
//! the collection names, the row documents that are not domain types
//! themselves, and the staging helpers the services share: every mutation of
//! a voucher also maintains its per-leg entry projections, its idempotency
//! index, and the audit log, inside the caller's transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, ActorId, AuditEventId, EntryId, VoucherId};
use infra_store::{StoreError, Transaction};

use crate::voucher::{EntrySide, SourceType, Voucher};

/// Collection names
pub mod collections {
    pub const VOUCHERS: &str = "vouchers";
    pub const ENTRIES: &str = "entries";
    pub const VOUCHER_SOURCES: &str = "voucher_sources";
    pub const DELETED_VOUCHERS: &str = "deleted_vouchers";
    pub const AUDIT_LOG: &str = "audit_log";
    pub const SOURCE_RECORDS: &str = "source_records";
}

/// Key of the idempotency index document for a business record
pub fn source_key(source_type: SourceType, source_id: &str) -> String {
    format!("{}:{}", source_type.as_str(), source_id)
}

/// Idempotency index row: `(sourceType, sourceId)` to voucher id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceIndexDoc {
    pub voucher_id: VoucherId,
}

/// Per-leg projection row, indexed by account for balance scans
///
/// Entry documents mirror the legs embedded in the voucher. The `excluded`
/// flag is how soft-deleted vouchers drop out of balance computation without
/// losing their data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDoc {
    pub id: EntryId,
    pub voucher_id: VoucherId,
    pub account_id: AccountId,
    pub side: EntrySide,
    pub amount: Decimal,
    pub note: Option<String>,
    pub excluded: bool,
}

/// Mirror of a soft-deleted voucher, kept for recovery and audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedVoucherDoc {
    pub voucher: Voucher,
    pub reason: String,
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: ActorId,
}

/// Operations recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    VoucherPosted,
    VoucherAmended,
    VoucherSoftDeleted,
    VoucherRestored,
    VoucherPurged,
    BalanceRepaired,
    MissingVoucherCreated,
}

/// Append-only record of a ledger operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEventId,
    pub at: DateTime<Utc>,
    pub actor: ActorId,
    pub action: AuditAction,
    pub voucher_id: VoucherId,
    pub detail: String,
}

/// Builds the entry projections of a voucher
pub fn entry_docs(voucher: &Voucher, excluded: bool) -> Vec<EntryDoc> {
    voucher
        .legs()
        .map(|(side, leg)| EntryDoc {
            id: leg.id,
            voucher_id: voucher.id,
            account_id: leg.account_id,
            side,
            amount: leg.amount,
            note: leg.note.clone(),
            excluded,
        })
        .collect()
}

/// Stages a voucher document and its entry projections
pub fn stage_voucher(tx: &mut Transaction, voucher: &Voucher) -> Result<(), StoreError> {
    tx.put(
        collections::VOUCHERS,
        &voucher.id.as_uuid().to_string(),
        voucher,
    )?;
    for doc in entry_docs(voucher, voucher.is_deleted) {
        tx.put(collections::ENTRIES, &doc.id.as_uuid().to_string(), &doc)?;
    }
    Ok(())
}

/// Stages removal of a voucher's entry projections
pub fn stage_entry_removal(tx: &mut Transaction, voucher: &Voucher) {
    for leg in voucher.debits.iter().chain(voucher.credits.iter()) {
        tx.delete(collections::ENTRIES, &leg.id.as_uuid().to_string());
    }
}

/// Stages the idempotency index row for a voucher
pub fn stage_source_index(tx: &mut Transaction, voucher: &Voucher) -> Result<(), StoreError> {
    tx.put(
        collections::VOUCHER_SOURCES,
        &source_key(voucher.source_type, &voucher.source_id),
        &SourceIndexDoc {
            voucher_id: voucher.id,
        },
    )
}

/// Stages an audit log entry
pub fn stage_audit(
    tx: &mut Transaction,
    actor: ActorId,
    action: AuditAction,
    voucher_id: VoucherId,
    detail: impl Into<String>,
) -> Result<(), StoreError> {
    let entry = AuditLogEntry {
        id: AuditEventId::new(),
        at: Utc::now(),
        actor,
        action,
        voucher_id,
        detail: detail.into(),
    };
    tx.put(
        collections::AUDIT_LOG,
        &entry.id.as_uuid().to_string(),
        &entry,
    )
}

/// Loads a voucher inside a transaction
pub async fn load_voucher(
    tx: &mut Transaction,
    id: VoucherId,
) -> Result<Option<Voucher>, StoreError> {
    tx.get(collections::VOUCHERS, &id.as_uuid().to_string()).await
}

/// Loads the deleted-records mirror of a voucher inside a transaction
pub async fn load_deleted(
    tx: &mut Transaction,
    id: VoucherId,
) -> Result<Option<DeletedVoucherDoc>, StoreError> {
    tx.get(collections::DELETED_VOUCHERS, &id.as_uuid().to_string())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    use crate::voucher::VoucherDraft;

    #[test]
    fn test_source_key_format() {
        assert_eq!(source_key(SourceType::Booking, "bk-7"), "booking:bk-7");
        assert_eq!(
            source_key(SourceType::StandardReceipt, "r1"),
            "standard_receipt:r1"
        );
    }

    #[test]
    fn test_entry_docs_carry_sides_and_flag() {
        let a = AccountId::new();
        let b = AccountId::new();
        let voucher = VoucherDraft::new(
            SourceType::Journal,
            "j1",
            Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
            Currency::USD,
        )
        .debit(a, dec!(40))
        .credit(b, dec!(40))
        .into_voucher(VoucherId::new(), Utc::now());

        let docs = entry_docs(&voucher, false);
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().any(|d| d.side == EntrySide::Debit && d.account_id == a));
        assert!(docs.iter().any(|d| d.side == EntrySide::Credit && d.account_id == b));
        assert!(docs.iter().all(|d| !d.excluded && d.voucher_id == voucher.id));
    }
}
