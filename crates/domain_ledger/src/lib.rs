//! Ledger Domain - Double-Entry Journal for the Travel Back-Office
//!
//! This crate implements the accounting core: business events become
//! balanced vouchers, vouchers carry a soft-delete lifecycle, and two audit
//! passes keep the entry set consistent after the fact.
//!
//! # Double-Entry Principles
//!
//! Every voucher carries debit legs and credit legs whose totals agree
//! within a fixed epsilon. The invariant is enforced at post time, preserved
//! by every amendment and repair, and re-checked by the balance audit.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{AccountRef, JournalPoster, SourceType};
//!
//! let id = poster
//!     .post_simple(
//!         SourceType::StandardReceipt,
//!         "r1",
//!         date,
//!         Currency::USD,
//!         amount,
//!         &AccountRef::CashBox("main".into()),
//!         &AccountRef::Client(company),
//!     )
//!     .await?;
//! ```

pub mod account;
pub mod audit;
pub mod chart;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod poster;
pub mod registry;
pub mod repo;
pub mod source;
pub mod voucher;

pub use account::{Account, AccountCategory, AccountGroup, AccountRef, TravelChartOfAccounts};
pub use audit::{
    AuditEngine, BalanceAuditReport, CompletenessAuditReport, FlaggedVoucher, RepairPolicy,
};
pub use chart::{ChartNode, ChartOfAccountsBuilder};
pub use error::LedgerError;
pub use events::VoucherEventSink;
pub use lifecycle::VoucherLifecycleManager;
pub use poster::JournalPoster;
pub use registry::AccountRegistry;
pub use source::SourceRecord;
pub use voucher::{
    EntryLeg, EntrySide, SourceType, Voucher, VoucherDraft, BALANCE_EPSILON,
};
