//! Business source records
//!
//! The business layer writes one document per booking, visa sale,
//! subscription, expense, or segment into the `source_records` collection.
//! The ledger reads them in two places: the completeness audit checks every
//! record has a voucher, and synthesizes the standard legs for those that
//! do not.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{CompanyId, Currency};

use crate::account::AccountRef;
use crate::error::LedgerError;
use crate::registry::AccountRegistry;
use crate::voucher::{EntryLeg, SourceType, VoucherDraft};

/// A business record the ledger derives a voucher from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Business identifier, shared with the voucher as idempotency key
    pub source_id: String,
    /// Kind of business event
    pub source_type: SourceType,
    /// Client company the record belongs to
    pub company_id: CompanyId,
    /// Effective date
    pub date: DateTime<Utc>,
    /// Currency of both prices
    pub currency: Currency,
    /// What the client is charged
    pub sale_price: Decimal,
    /// What the supplier charges the agency
    pub purchase_price: Decimal,
    /// Supplier code, when the purchase side is attributable
    pub supplier: Option<String>,
    /// Free-text description
    pub description: Option<String>,
}

impl SourceRecord {
    /// The revenue line a sale of this type posts to
    fn revenue_line(&self) -> &'static str {
        match self.source_type {
            SourceType::Visa => "visas",
            SourceType::Subscription => "subscriptions",
            SourceType::Segment => "segments",
            _ => "tickets",
        }
    }

    /// The expense line the purchase side posts to
    fn expense_line(&self) -> &'static str {
        match self.source_type {
            SourceType::Visa => "visa-costs",
            SourceType::Subscription => "subscription-costs",
            SourceType::Segment => "segment-costs",
            SourceType::Expense => "operating",
            _ => "ticket-costs",
        }
    }

    /// Builds the standard balanced legs for this record
    ///
    /// Sales: debit the client receivable, credit the revenue line; the
    /// purchase side debits the expense line and credits the supplier
    /// payable (or the purchase clearing account when no supplier is
    /// attributed). Expenses: debit the expense line, credit the main cash
    /// box. Remittances: debit the main cash box, credit remittance
    /// clearing. Receipts and payments: move money between the cash box and
    /// the client receivable.
    pub fn to_draft(&self, registry: &AccountRegistry) -> Result<VoucherDraft, LedgerError> {
        let mut draft = VoucherDraft::new(
            self.source_type,
            self.source_id.clone(),
            self.date,
            self.currency,
        )
        .for_company(self.company_id);

        match self.source_type {
            SourceType::Booking
            | SourceType::Visa
            | SourceType::Subscription
            | SourceType::Segment => {
                let client = registry.resolve(&AccountRef::Client(self.company_id))?;
                let revenue =
                    registry.resolve(&AccountRef::RevenueLine(self.revenue_line().into()))?;
                let mut sale_leg = EntryLeg::new(client, self.sale_price);
                if let Some(description) = &self.description {
                    sale_leg = sale_leg.with_note(description.clone());
                }
                draft = draft
                    .debit_leg(sale_leg)
                    .credit(revenue, self.sale_price);

                if self.purchase_price > Decimal::ZERO {
                    let expense =
                        registry.resolve(&AccountRef::ExpenseLine(self.expense_line().into()))?;
                    let payable = match &self.supplier {
                        Some(code) => registry.resolve(&AccountRef::Supplier(code.clone()))?,
                        None => registry.resolve(&AccountRef::Clearing("purchases".into()))?,
                    };
                    draft = draft
                        .debit(expense, self.purchase_price)
                        .credit(payable, self.purchase_price);
                }
            }
            SourceType::Expense => {
                let expense =
                    registry.resolve(&AccountRef::ExpenseLine(self.expense_line().into()))?;
                let cash = registry.resolve(&AccountRef::CashBox("main".into()))?;
                draft = draft
                    .debit(expense, self.sale_price)
                    .credit(cash, self.sale_price);
            }
            SourceType::Remittance => {
                let cash = registry.resolve(&AccountRef::CashBox("main".into()))?;
                let clearing = registry.resolve(&AccountRef::Clearing("remittances".into()))?;
                draft = draft
                    .debit(cash, self.sale_price)
                    .credit(clearing, self.sale_price);
            }
            SourceType::Payment
            | SourceType::StandardReceipt
            | SourceType::DistributedReceipt
            | SourceType::Journal => {
                let cash = registry.resolve(&AccountRef::CashBox("main".into()))?;
                let client = registry.resolve(&AccountRef::Client(self.company_id))?;
                draft = draft
                    .debit(cash, self.sale_price)
                    .credit(client, self.sale_price);
            }
        }

        Ok(draft)
    }
}
