//! Ledger domain errors

use core_kernel::VoucherId;
use infra_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entries do not balance within the ledger epsilon
    #[error("Unbalanced entry: debits={debits}, credits={credits}")]
    UnbalancedEntry { debits: Decimal, credits: Decimal },

    /// A voucher must carry at least one entry
    #[error("Voucher has no entries")]
    EmptyVoucher,

    /// Entry amounts must be non-negative
    #[error("Negative entry amount: {0}")]
    NegativeAmount(Decimal),

    /// Account reference could not be resolved
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Registry configuration contains a duplicate code or reference
    #[error("Duplicate account: {0}")]
    DuplicateAccount(String),

    /// Voucher not found
    #[error("Voucher not found: {0}")]
    NotFound(VoucherId),

    /// Lifecycle transition not valid from the voucher's current state
    #[error("Invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    /// Balance audit cannot decide which leg of a multi-leg voucher is wrong
    #[error("Ambiguous imbalance on {voucher_id}: {legs} legs, delta {delta}")]
    AmbiguousImbalance {
        voucher_id: VoucherId,
        legs: usize,
        delta: Decimal,
    },

    /// Underlying store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns true if the error is a transient store failure worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Store(e) if e.is_transient())
    }
}
