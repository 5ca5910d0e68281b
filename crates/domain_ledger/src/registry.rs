//! Account registry
//!
//! Resolves logical account references to stable account identifiers and
//! answers category questions about accounts. The registry is pure lookup:
//! it is built once from configuration, and every classification (which
//! group, which category, which company) is answered from the maps built at
//! construction time.

use std::collections::HashMap;

use core_kernel::{AccountId, CompanyId};

use crate::account::{Account, AccountCategory, AccountGroup, AccountRef, TravelChartOfAccounts};
use crate::error::LedgerError;

/// Immutable lookup table over the configured account set
#[derive(Debug)]
pub struct AccountRegistry {
    accounts: HashMap<AccountId, Account>,
    by_ref: HashMap<AccountRef, AccountId>,
    by_code: HashMap<String, AccountId>,
}

impl AccountRegistry {
    /// Builds a registry from a configured account list
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAccount` if two accounts share a code or a logical
    /// reference.
    pub fn new(accounts: Vec<Account>) -> Result<Self, LedgerError> {
        let mut by_id = HashMap::with_capacity(accounts.len());
        let mut by_ref = HashMap::new();
        let mut by_code = HashMap::new();

        for account in accounts {
            if by_code.insert(account.code.clone(), account.id).is_some() {
                return Err(LedgerError::DuplicateAccount(account.code));
            }
            if let Some(reference) = &account.reference {
                if by_ref.insert(reference.clone(), account.id).is_some() {
                    return Err(LedgerError::DuplicateAccount(format!("{:?}", reference)));
                }
            }
            by_id.insert(account.id, account);
        }

        Ok(Self {
            accounts: by_id,
            by_ref,
            by_code,
        })
    }

    /// Builds a registry holding only the standard travel chart
    pub fn standard() -> Self {
        Self::new(TravelChartOfAccounts::standard_accounts())
            .expect("standard chart contains no duplicates")
    }

    /// Builds a registry from the standard chart plus deployment accounts
    /// (clients, suppliers, extra boxes)
    pub fn standard_with(extra: Vec<Account>) -> Result<Self, LedgerError> {
        let mut accounts = TravelChartOfAccounts::standard_accounts();
        accounts.extend(extra);
        Self::new(accounts)
    }

    /// Resolves a logical reference to its account id
    pub fn resolve(&self, reference: &AccountRef) -> Result<AccountId, LedgerError> {
        self.by_ref
            .get(reference)
            .copied()
            .ok_or_else(|| LedgerError::UnknownAccount(format!("{:?}", reference)))
    }

    /// Looks up an account by id
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Looks up an account by code
    pub fn get_by_code(&self, code: &str) -> Option<&Account> {
        self.by_code.get(code).and_then(|id| self.accounts.get(id))
    }

    /// Returns true if the account id is registered
    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// The group of an account, if registered
    pub fn group_of(&self, id: AccountId) -> Option<AccountGroup> {
        self.accounts.get(&id).map(|a| a.group)
    }

    /// The root category of an account, if registered
    pub fn category_of(&self, id: AccountId) -> Option<AccountCategory> {
        self.accounts.get(&id).map(|a| a.category())
    }

    /// The owning company of an account, for client receivables
    pub fn company_of(&self, id: AccountId) -> Option<CompanyId> {
        self.accounts.get(&id).and_then(|a| a.company_id())
    }

    /// Iterates over every registered account
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no accounts are registered
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
