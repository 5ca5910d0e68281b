//! Chart of accounts balance computation
//!
//! Derives hierarchical account balances from the full entry set. The build
//! is a pure function of the store contents: nothing is persisted, nothing
//! is memoized, and two builds with no intervening postings produce
//! identical trees.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::AccountId;
use infra_store::Store;

use crate::account::{Account, AccountCategory, AccountGroup};
use crate::error::LedgerError;
use crate::registry::AccountRegistry;
use crate::repo::{collections, EntryDoc};
use crate::voucher::EntrySide;

/// One node of the rebuilt chart
///
/// Taxonomy nodes (roots and groups) carry no account id; leaves do. The
/// aggregated totals of a parent are the fold of its children, never an
/// independent accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartNode {
    pub code: String,
    pub name: String,
    pub category: AccountCategory,
    pub account_id: Option<AccountId>,
    /// Totals from entries posted directly against this account
    pub own_debit: Decimal,
    pub own_credit: Decimal,
    /// Own totals plus all descendants
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub children: Vec<ChartNode>,
}

impl ChartNode {
    fn taxonomy(code: &str, name: &str, category: AccountCategory) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            category,
            account_id: None,
            own_debit: Decimal::ZERO,
            own_credit: Decimal::ZERO,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            children: Vec::new(),
        }
    }

    fn fold_children(mut self, children: Vec<ChartNode>) -> Self {
        self.total_debit = self.own_debit + children.iter().map(|c| c.total_debit).sum::<Decimal>();
        self.total_credit =
            self.own_credit + children.iter().map(|c| c.total_credit).sum::<Decimal>();
        self.children = children;
        self
    }
}

/// On-demand chart of accounts builder
pub struct ChartOfAccountsBuilder {
    store: Store,
    registry: Arc<AccountRegistry>,
}

impl ChartOfAccountsBuilder {
    /// Creates a builder over the given store and registry
    pub fn new(store: Store, registry: Arc<AccountRegistry>) -> Self {
        Self { store, registry }
    }

    /// Rebuilds the full chart from every non-excluded entry
    ///
    /// Returns the four root nodes: assets, liabilities, revenue, expenses.
    pub async fn build(&self) -> Result<Vec<ChartNode>, LedgerError> {
        let entries: Vec<(String, EntryDoc)> = self.store.list(collections::ENTRIES).await?;

        let mut totals: HashMap<AccountId, (Decimal, Decimal)> = HashMap::new();
        let mut scanned = 0usize;
        for (_, entry) in &entries {
            if entry.excluded {
                continue;
            }
            scanned += 1;
            let slot = totals.entry(entry.account_id).or_default();
            match entry.side {
                EntrySide::Debit => slot.0 += entry.amount,
                EntrySide::Credit => slot.1 += entry.amount,
            }
        }
        debug!(entries = scanned, "Chart rebuild scanned entries");

        // Accounts nest under a registered parent; everything else sits at
        // the top of its group.
        let mut children_of: HashMap<AccountId, Vec<&Account>> = HashMap::new();
        let mut group_roots: HashMap<AccountGroup, Vec<&Account>> = HashMap::new();
        for account in self.registry.accounts() {
            match account.parent_id.filter(|p| self.registry.contains(*p)) {
                Some(parent) => children_of.entry(parent).or_default().push(account),
                None => group_roots.entry(account.group).or_default().push(account),
            }
        }

        let mut group_node = |group: AccountGroup, code: &str, name: &str| -> ChartNode {
            let mut accounts = group_roots.remove(&group).unwrap_or_default();
            accounts.sort_by(|a, b| a.code.cmp(&b.code));
            let children = accounts
                .into_iter()
                .map(|a| build_account_node(a, &children_of, &totals))
                .collect();
            ChartNode::taxonomy(code, name, group.category()).fold_children(children)
        };

        let receivables = group_node(AccountGroup::Receivables, "1100", "Receivables");
        let cash = group_node(AccountGroup::CashAndBank, "1200", "Cash and Bank");
        let payables = group_node(AccountGroup::Payables, "2100", "Payables");
        let clearing = group_node(AccountGroup::Clearing, "2200", "Clearing");
        let revenue_lines = group_node(AccountGroup::Revenue, "4000", "Revenue");
        let expense_lines = group_node(AccountGroup::Expense, "5000", "Expenses");

        let assets = ChartNode::taxonomy("1000", "Assets", AccountCategory::Asset)
            .fold_children(vec![receivables, cash]);
        let liabilities = ChartNode::taxonomy("2000", "Liabilities", AccountCategory::Liability)
            .fold_children(vec![payables, clearing]);

        Ok(vec![assets, liabilities, revenue_lines, expense_lines])
    }
}

fn build_account_node(
    account: &Account,
    children_of: &HashMap<AccountId, Vec<&Account>>,
    totals: &HashMap<AccountId, (Decimal, Decimal)>,
) -> ChartNode {
    let (own_debit, own_credit) = totals.get(&account.id).copied().unwrap_or_default();

    let mut nested = children_of.get(&account.id).cloned().unwrap_or_default();
    nested.sort_by(|a, b| a.code.cmp(&b.code));
    let children: Vec<ChartNode> = nested
        .into_iter()
        .map(|child| build_account_node(child, children_of, totals))
        .collect();

    ChartNode {
        code: account.code.clone(),
        name: account.name.clone(),
        category: account.category(),
        account_id: Some(account.id),
        own_debit,
        own_credit,
        total_debit: Decimal::ZERO,
        total_credit: Decimal::ZERO,
        children: Vec::new(),
    }
    .fold_children(children)
}

impl std::fmt::Debug for ChartOfAccountsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartOfAccountsBuilder")
            .field("accounts", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{EntryId, VoucherId};
    use rust_decimal_macros::dec;

    use crate::account::AccountRef;

    async fn seed_entry(
        store: &Store,
        account_id: AccountId,
        side: EntrySide,
        amount: Decimal,
        excluded: bool,
    ) {
        let doc = EntryDoc {
            id: EntryId::new(),
            voucher_id: VoucherId::new(),
            account_id,
            side,
            amount,
            note: None,
            excluded,
        };
        store
            .put(collections::ENTRIES, &doc.id.as_uuid().to_string(), &doc)
            .await
            .unwrap();
    }

    fn find<'a>(nodes: &'a [ChartNode], code: &str) -> &'a ChartNode {
        fn walk<'a>(node: &'a ChartNode, code: &str) -> Option<&'a ChartNode> {
            if node.code == code {
                return Some(node);
            }
            node.children.iter().find_map(|c| walk(c, code))
        }
        nodes
            .iter()
            .find_map(|n| walk(n, code))
            .unwrap_or_else(|| panic!("no node with code {}", code))
    }

    #[tokio::test]
    async fn test_empty_store_builds_zeroed_taxonomy() {
        let store = Store::in_memory();
        let builder = ChartOfAccountsBuilder::new(store, Arc::new(AccountRegistry::standard()));

        let chart = builder.build().await.unwrap();
        assert_eq!(chart.len(), 4);
        assert!(chart
            .iter()
            .all(|root| root.total_debit.is_zero() && root.total_credit.is_zero()));

        let revenue = find(&chart, "4000");
        assert!(!revenue.children.is_empty());
    }

    #[tokio::test]
    async fn test_totals_fold_bottom_up() {
        let store = Store::in_memory();
        let registry = Arc::new(AccountRegistry::standard());
        let cash = registry.resolve(&AccountRef::CashBox("main".into())).unwrap();
        let desk = registry
            .resolve(&AccountRef::ExchangeDesk("main".into()))
            .unwrap();

        seed_entry(&store, cash, EntrySide::Debit, dec!(100), false).await;
        seed_entry(&store, cash, EntrySide::Credit, dec!(30), false).await;
        seed_entry(&store, desk, EntrySide::Debit, dec!(50), false).await;

        let builder = ChartOfAccountsBuilder::new(store, registry);
        let chart = builder.build().await.unwrap();

        let cash_node = find(&chart, "1210");
        assert_eq!(cash_node.own_debit, dec!(100));
        assert_eq!(cash_node.own_credit, dec!(30));

        let group = find(&chart, "1200");
        assert_eq!(group.total_debit, dec!(150));
        assert_eq!(group.total_credit, dec!(30));
        assert!(group.own_debit.is_zero());

        let assets = find(&chart, "1000");
        assert_eq!(assets.total_debit, dec!(150));
    }

    #[tokio::test]
    async fn test_excluded_entries_do_not_count() {
        let store = Store::in_memory();
        let registry = Arc::new(AccountRegistry::standard());
        let cash = registry.resolve(&AccountRef::CashBox("main".into())).unwrap();

        seed_entry(&store, cash, EntrySide::Debit, dec!(100), false).await;
        seed_entry(&store, cash, EntrySide::Debit, dec!(999), true).await;

        let builder = ChartOfAccountsBuilder::new(store, registry);
        let chart = builder.build().await.unwrap();

        assert_eq!(find(&chart, "1210").own_debit, dec!(100));
    }

    #[tokio::test]
    async fn test_nested_accounts_roll_into_parent() {
        let parent = Account::new(
            AccountId::new(),
            "1230",
            "Branch Boxes",
            AccountGroup::CashAndBank,
        );
        let parent_id = parent.id;
        let child = Account::new(
            AccountId::new(),
            "1231",
            "Airport Branch",
            AccountGroup::CashAndBank,
        )
        .with_parent(parent_id);
        let child_id = child.id;

        let registry = Arc::new(AccountRegistry::standard_with(vec![parent, child]).unwrap());
        let store = Store::in_memory();
        seed_entry(&store, child_id, EntrySide::Debit, dec!(70), false).await;

        let builder = ChartOfAccountsBuilder::new(store, registry);
        let chart = builder.build().await.unwrap();

        let parent_node = find(&chart, "1230");
        assert_eq!(parent_node.children.len(), 1);
        assert!(parent_node.own_debit.is_zero());
        assert_eq!(parent_node.total_debit, dec!(70));
    }

    #[tokio::test]
    async fn test_rebuild_is_deterministic() {
        let store = Store::in_memory();
        let registry = Arc::new(AccountRegistry::standard());
        let cash = registry.resolve(&AccountRef::CashBox("main".into())).unwrap();
        seed_entry(&store, cash, EntrySide::Debit, dec!(42), false).await;

        let builder = ChartOfAccountsBuilder::new(store, registry);
        let first = builder.build().await.unwrap();
        let second = builder.build().await.unwrap();

        assert_eq!(first, second);
    }
}
