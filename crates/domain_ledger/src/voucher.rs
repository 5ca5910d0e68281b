//! Voucher and entry types
//!
//! A voucher is one atomic, balanced accounting transaction: a set of debit
//! legs and credit legs whose totals agree within the ledger epsilon. Once
//! posted a voucher is immutable except for soft-delete flags, audit-repair
//! corrections, and explicit amendments, all of which preserve the balance
//! invariant.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, ActorId, CompanyId, Currency, EntryId, VoucherId};

use crate::error::LedgerError;

/// Absolute tolerance for the ledger balance invariant
///
/// Upstream systems post float-rounded amounts; anything inside this band
/// counts as balanced.
pub const BALANCE_EPSILON: Decimal = dec!(0.001);

/// Kind of business event a voucher originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Booking,
    Visa,
    Subscription,
    Expense,
    Payment,
    StandardReceipt,
    DistributedReceipt,
    Journal,
    Remittance,
    Segment,
}

impl SourceType {
    /// Returns true if vouchers of this type count toward the monthly
    /// bookings counter
    pub fn counts_toward_bookings(&self) -> bool {
        matches!(
            self,
            SourceType::Booking | SourceType::Visa | SourceType::Subscription
        )
    }

    /// Stable lowercase name, used in store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Booking => "booking",
            SourceType::Visa => "visa",
            SourceType::Subscription => "subscription",
            SourceType::Expense => "expense",
            SourceType::Payment => "payment",
            SourceType::StandardReceipt => "standard_receipt",
            SourceType::DistributedReceipt => "distributed_receipt",
            SourceType::Journal => "journal",
            SourceType::Remittance => "remittance",
            SourceType::Segment => "segment",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(SourceType::Booking),
            "visa" => Ok(SourceType::Visa),
            "subscription" => Ok(SourceType::Subscription),
            "expense" => Ok(SourceType::Expense),
            "payment" => Ok(SourceType::Payment),
            "standard_receipt" => Ok(SourceType::StandardReceipt),
            "distributed_receipt" => Ok(SourceType::DistributedReceipt),
            "journal" => Ok(SourceType::Journal),
            "remittance" => Ok(SourceType::Remittance),
            "segment" => Ok(SourceType::Segment),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

/// Which side of the ledger a leg posts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    Debit,
    Credit,
}

/// One line of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryLeg {
    /// Unique leg identifier
    pub id: EntryId,
    /// Account the leg posts against
    pub account_id: AccountId,
    /// Amount, always non-negative
    pub amount: Decimal,
    /// Optional free-text note
    pub note: Option<String>,
}

impl EntryLeg {
    /// Creates a new leg
    pub fn new(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            id: EntryId::new(),
            account_id,
            amount,
            note: None,
        }
    }

    /// Adds a note to the leg
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One atomic, balanced accounting transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique identifier
    pub id: VoucherId,
    /// Kind of business event this voucher records
    pub source_type: SourceType,
    /// Identifier of the originating business record (idempotency key)
    pub source_id: String,
    /// Company the voucher's rollup contribution attaches to
    pub company_id: Option<CompanyId>,
    /// Currency of every leg
    pub currency: Currency,
    /// Effective date of the transaction
    pub date: DateTime<Utc>,
    /// Debit legs
    pub debits: Vec<EntryLeg>,
    /// Credit legs
    pub credits: Vec<EntryLeg>,
    /// Author of the posting
    pub created_by: ActorId,
    /// When the voucher was posted
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag
    pub is_deleted: bool,
    /// When the voucher was soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
    /// Who soft-deleted the voucher
    pub deleted_by: Option<ActorId>,
    /// Note stamped by audit repairs
    pub audit_note: Option<String>,
}

impl Voucher {
    /// Sum of all debit legs
    pub fn debit_total(&self) -> Decimal {
        self.debits.iter().map(|leg| leg.amount).sum()
    }

    /// Sum of all credit legs
    pub fn credit_total(&self) -> Decimal {
        self.credits.iter().map(|leg| leg.amount).sum()
    }

    /// Signed imbalance: debit total minus credit total
    pub fn imbalance(&self) -> Decimal {
        self.debit_total() - self.credit_total()
    }

    /// Returns true if the voucher satisfies the ledger invariant
    pub fn is_balanced(&self) -> bool {
        self.imbalance().abs() < BALANCE_EPSILON
    }

    /// Total number of legs on both sides
    pub fn leg_count(&self) -> usize {
        self.debits.len() + self.credits.len()
    }

    /// Iterates over all legs with their side
    pub fn legs(&self) -> impl Iterator<Item = (EntrySide, &EntryLeg)> {
        self.debits
            .iter()
            .map(|leg| (EntrySide::Debit, leg))
            .chain(self.credits.iter().map(|leg| (EntrySide::Credit, leg)))
    }
}

/// Builder for a voucher about to be posted
///
/// The draft carries everything the caller decides; the poster assigns the
/// identifier and creation metadata when it persists the voucher.
#[derive(Debug, Clone)]
pub struct VoucherDraft {
    pub source_type: SourceType,
    pub source_id: String,
    pub company_id: Option<CompanyId>,
    pub currency: Currency,
    pub date: DateTime<Utc>,
    pub debits: Vec<EntryLeg>,
    pub credits: Vec<EntryLeg>,
    pub created_by: ActorId,
}

impl VoucherDraft {
    /// Creates a new draft
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        date: DateTime<Utc>,
        currency: Currency,
    ) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
            company_id: None,
            currency,
            date,
            debits: Vec::new(),
            credits: Vec::new(),
            created_by: ActorId::new(),
        }
    }

    /// Attributes the voucher's rollup contribution to a company
    pub fn for_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// Sets the posting author
    pub fn created_by(mut self, actor: ActorId) -> Self {
        self.created_by = actor;
        self
    }

    /// Adds a debit leg
    pub fn debit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.debits.push(EntryLeg::new(account_id, amount));
        self
    }

    /// Adds a credit leg
    pub fn credit(mut self, account_id: AccountId, amount: Decimal) -> Self {
        self.credits.push(EntryLeg::new(account_id, amount));
        self
    }

    /// Adds a pre-built debit leg
    pub fn debit_leg(mut self, leg: EntryLeg) -> Self {
        self.debits.push(leg);
        self
    }

    /// Adds a pre-built credit leg
    pub fn credit_leg(mut self, leg: EntryLeg) -> Self {
        self.credits.push(leg);
        self
    }

    /// Sum of all debit legs
    pub fn debit_total(&self) -> Decimal {
        self.debits.iter().map(|leg| leg.amount).sum()
    }

    /// Sum of all credit legs
    pub fn credit_total(&self) -> Decimal {
        self.credits.iter().map(|leg| leg.amount).sum()
    }

    /// Checks the posting preconditions
    ///
    /// # Errors
    ///
    /// - `EmptyVoucher` if no legs are present
    /// - `NegativeAmount` if any leg is negative
    /// - `UnbalancedEntry` if totals disagree beyond the epsilon
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.debits.is_empty() && self.credits.is_empty() {
            return Err(LedgerError::EmptyVoucher);
        }

        for leg in self.debits.iter().chain(self.credits.iter()) {
            if leg.amount.is_sign_negative() {
                return Err(LedgerError::NegativeAmount(leg.amount));
            }
        }

        let debits = self.debit_total();
        let credits = self.credit_total();
        if (debits - credits).abs() >= BALANCE_EPSILON {
            return Err(LedgerError::UnbalancedEntry { debits, credits });
        }

        Ok(())
    }

    /// Materializes the draft into a voucher
    ///
    /// The poster calls this once the draft passes validation; it does not
    /// persist anything by itself.
    pub fn into_voucher(self, id: VoucherId, now: DateTime<Utc>) -> Voucher {
        Voucher {
            id,
            source_type: self.source_type,
            source_id: self.source_id,
            company_id: self.company_id,
            currency: self.currency,
            date: self.date,
            debits: self.debits,
            credits: self.credits,
            created_by: self.created_by,
            created_at: now,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            audit_note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft() -> VoucherDraft {
        VoucherDraft::new(
            SourceType::StandardReceipt,
            "r1",
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            Currency::USD,
        )
    }

    #[test]
    fn test_balanced_draft_validates() {
        let a = AccountId::new();
        let b = AccountId::new();
        let d = draft().debit(a, dec!(100)).credit(b, dec!(100));

        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_empty_draft_rejected() {
        assert!(matches!(draft().validate(), Err(LedgerError::EmptyVoucher)));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let a = AccountId::new();
        let b = AccountId::new();
        let d = draft().debit(a, dec!(-5)).credit(b, dec!(-5));

        assert!(matches!(
            d.validate(),
            Err(LedgerError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_unbalanced_draft_rejected() {
        let a = AccountId::new();
        let b = AccountId::new();
        let d = draft().debit(a, dec!(100)).credit(b, dec!(90));

        match d.validate() {
            Err(LedgerError::UnbalancedEntry { debits, credits }) => {
                assert_eq!(debits, dec!(100));
                assert_eq!(credits, dec!(90));
            }
            other => panic!("expected UnbalancedEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_rounding_residue_inside_epsilon_accepted() {
        let a = AccountId::new();
        let b = AccountId::new();
        let d = draft().debit(a, dec!(100.0004)).credit(b, dec!(100.0));

        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_voucher_balance_predicates() {
        let a = AccountId::new();
        let b = AccountId::new();
        let v = draft()
            .debit(a, dec!(70))
            .debit(a, dec!(30))
            .credit(b, dec!(100))
            .into_voucher(VoucherId::new(), Utc::now());

        assert_eq!(v.debit_total(), dec!(100));
        assert_eq!(v.credit_total(), dec!(100));
        assert_eq!(v.imbalance(), dec!(0));
        assert!(v.is_balanced());
        assert_eq!(v.leg_count(), 3);
        assert_eq!(v.legs().count(), 3);
    }

    #[test]
    fn test_source_type_booking_eligibility() {
        assert!(SourceType::Booking.counts_toward_bookings());
        assert!(SourceType::Visa.counts_toward_bookings());
        assert!(SourceType::Subscription.counts_toward_bookings());
        assert!(!SourceType::Expense.counts_toward_bookings());
        assert!(!SourceType::StandardReceipt.counts_toward_bookings());
    }

    #[test]
    fn test_source_type_round_trips_through_str() {
        for st in [
            SourceType::Booking,
            SourceType::DistributedReceipt,
            SourceType::Remittance,
        ] {
            let parsed: SourceType = st.as_str().parse().unwrap();
            assert_eq!(parsed, st);
        }
        assert!("invoice".parse::<SourceType>().is_err());
    }
}
