//! Synchronous voucher event interface
//!
//! The original system reacted to voucher writes through external triggers
//! delivered at-least-once, and deduplicated by hand. Here the consumers are
//! called synchronously inside the same transaction as the voucher write:
//! a sink stages its own writes into the caller's transaction, so the
//! voucher and its downstream effects commit together or not at all.

use async_trait::async_trait;
use infra_store::Transaction;

use crate::error::LedgerError;
use crate::voucher::Voucher;

/// Consumer of voucher lifecycle events
///
/// Implementations must only stage writes into the supplied transaction;
/// they must not commit or issue out-of-transaction writes, or the
/// atomicity guarantee is lost.
#[async_trait]
pub trait VoucherEventSink: Send + Sync {
    /// A voucher is being created (posted or restored)
    async fn on_voucher_created(
        &self,
        tx: &mut Transaction,
        voucher: &Voucher,
    ) -> Result<(), LedgerError>;

    /// A voucher is being rewritten (amendment or audit repair)
    async fn on_voucher_updated(
        &self,
        tx: &mut Transaction,
        before: &Voucher,
        after: &Voucher,
    ) -> Result<(), LedgerError>;

    /// A voucher is being soft-deleted
    async fn on_voucher_deleted(
        &self,
        tx: &mut Transaction,
        voucher: &Voucher,
    ) -> Result<(), LedgerError>;
}
