//! Account types for the chart of accounts
//!
//! This module defines the account structure for double-entry bookkeeping:
//! the fixed root taxonomy, the intermediate groups, and the concrete
//! accounts (clients, suppliers, cash boxes, revenue and expense lines).

use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, CompanyId};

/// Root categories of the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Revenue accounts (credit normal balance)
    Revenue,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountCategory {
    /// Returns true if this category has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountCategory::Asset | AccountCategory::Expense)
    }
}

/// Intermediate grouping an account hangs under
///
/// The group fixes the account's root category: receivables and
/// cash-and-bank are assets, payables and clearing are liabilities, revenue
/// and expense lines sit directly under their roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountGroup {
    /// Client balances owed to the agency
    Receivables,
    /// Cash boxes, bank accounts, and exchange desks
    CashAndBank,
    /// Supplier balances the agency owes
    Payables,
    /// Internal clearing accounts for in-transit funds
    Clearing,
    /// Revenue lines
    Revenue,
    /// Expense lines
    Expense,
}

impl AccountGroup {
    /// The root category this group belongs to
    pub fn category(&self) -> AccountCategory {
        match self {
            AccountGroup::Receivables | AccountGroup::CashAndBank => AccountCategory::Asset,
            AccountGroup::Payables | AccountGroup::Clearing => AccountCategory::Liability,
            AccountGroup::Revenue => AccountCategory::Revenue,
            AccountGroup::Expense => AccountCategory::Expense,
        }
    }
}

/// Logical handle a collaborator uses to name an account
///
/// Business code never passes raw account ids around; it speaks in terms of
/// "the receivable account of company X" or "the tickets revenue line", and
/// the registry resolves that to a stable [`AccountId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum AccountRef {
    /// Receivable account of a client company
    Client(CompanyId),
    /// Payable account of a supplier, keyed by supplier code
    Supplier(String),
    /// A physical or logical cash box
    CashBox(String),
    /// An exchange desk float
    ExchangeDesk(String),
    /// A revenue line, keyed by product line code
    RevenueLine(String),
    /// An expense line, keyed by product line code
    ExpenseLine(String),
    /// An internal clearing account
    Clearing(String),
}

impl AccountRef {
    /// The group an account with this reference belongs to
    pub fn group(&self) -> AccountGroup {
        match self {
            AccountRef::Client(_) => AccountGroup::Receivables,
            AccountRef::Supplier(_) => AccountGroup::Payables,
            AccountRef::CashBox(_) | AccountRef::ExchangeDesk(_) => AccountGroup::CashAndBank,
            AccountRef::RevenueLine(_) => AccountGroup::Revenue,
            AccountRef::ExpenseLine(_) => AccountGroup::Expense,
            AccountRef::Clearing(_) => AccountGroup::Clearing,
        }
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account code (e.g., "1110")
    pub code: String,
    /// Account name
    pub name: String,
    /// Grouping, which fixes the root category
    pub group: AccountGroup,
    /// Parent account ID (for nested sub-accounts)
    pub parent_id: Option<AccountId>,
    /// Logical reference collaborators resolve this account by
    pub reference: Option<AccountRef>,
    /// Whether account is active
    pub is_active: bool,
}

impl Account {
    /// Creates a new account
    pub fn new(
        id: AccountId,
        code: impl Into<String>,
        name: impl Into<String>,
        group: AccountGroup,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            group,
            parent_id: None,
            reference: None,
            is_active: true,
        }
    }

    /// The root category, inherited from the group
    pub fn category(&self) -> AccountCategory {
        self.group.category()
    }

    /// The company this account belongs to, for client receivables
    pub fn company_id(&self) -> Option<CompanyId> {
        match &self.reference {
            Some(AccountRef::Client(company)) => Some(*company),
            _ => None,
        }
    }

    /// Sets the parent account
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the logical reference
    pub fn with_reference(mut self, reference: AccountRef) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Standard chart of accounts for a travel agency
pub struct TravelChartOfAccounts;

impl TravelChartOfAccounts {
    /// Creates the standard account set
    ///
    /// Client and supplier accounts are deployment data and are registered
    /// on top of this set.
    pub fn standard_accounts() -> Vec<Account> {
        vec![
            // Cash and bank
            Account::new(AccountId::new(), "1210", "Main Cash Box", AccountGroup::CashAndBank)
                .with_reference(AccountRef::CashBox("main".into())),
            Account::new(AccountId::new(), "1220", "Exchange Desk", AccountGroup::CashAndBank)
                .with_reference(AccountRef::ExchangeDesk("main".into())),
            // Clearing
            Account::new(AccountId::new(), "2210", "Remittance Clearing", AccountGroup::Clearing)
                .with_reference(AccountRef::Clearing("remittances".into())),
            Account::new(AccountId::new(), "2220", "Purchase Clearing", AccountGroup::Clearing)
                .with_reference(AccountRef::Clearing("purchases".into())),
            // Revenue lines
            Account::new(AccountId::new(), "4100", "Ticket Revenue", AccountGroup::Revenue)
                .with_reference(AccountRef::RevenueLine("tickets".into())),
            Account::new(AccountId::new(), "4200", "Visa Revenue", AccountGroup::Revenue)
                .with_reference(AccountRef::RevenueLine("visas".into())),
            Account::new(AccountId::new(), "4300", "Subscription Revenue", AccountGroup::Revenue)
                .with_reference(AccountRef::RevenueLine("subscriptions".into())),
            Account::new(AccountId::new(), "4400", "Segment Revenue", AccountGroup::Revenue)
                .with_reference(AccountRef::RevenueLine("segments".into())),
            Account::new(AccountId::new(), "4500", "Service Fees", AccountGroup::Revenue)
                .with_reference(AccountRef::RevenueLine("fees".into())),
            // Expense lines
            Account::new(AccountId::new(), "5100", "Ticket Costs", AccountGroup::Expense)
                .with_reference(AccountRef::ExpenseLine("ticket-costs".into())),
            Account::new(AccountId::new(), "5200", "Visa Costs", AccountGroup::Expense)
                .with_reference(AccountRef::ExpenseLine("visa-costs".into())),
            Account::new(AccountId::new(), "5300", "Subscription Costs", AccountGroup::Expense)
                .with_reference(AccountRef::ExpenseLine("subscription-costs".into())),
            Account::new(AccountId::new(), "5400", "Segment Costs", AccountGroup::Expense)
                .with_reference(AccountRef::ExpenseLine("segment-costs".into())),
            Account::new(AccountId::new(), "5500", "Operating Expenses", AccountGroup::Expense)
                .with_reference(AccountRef::ExpenseLine("operating".into())),
        ]
    }
}
