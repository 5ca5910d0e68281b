//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the ledger suite. Identifiers are fixed so
//! tests are predictable and failure output is recognizable.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{AccountId, ActorId, CompanyId, MonthId};
use domain_ledger::{Account, AccountGroup, AccountRef, AccountRegistry};

/// The fixed client company every scenario posts for
pub static COMPANY_C1: Lazy<CompanyId> =
    Lazy::new(|| CompanyId::from(Uuid::from_u128(0xC1_0001)));

/// A second company for isolation tests
pub static COMPANY_C2: Lazy<CompanyId> =
    Lazy::new(|| CompanyId::from(Uuid::from_u128(0xC2_0002)));

/// The operator actor audit runs are attributed to in tests
pub static OPERATOR: Lazy<ActorId> = Lazy::new(|| ActorId::from(Uuid::from_u128(0x0B_0001)));

/// Fixture for amounts
pub struct AmountFixtures;

impl AmountFixtures {
    /// A typical booking sale price
    pub fn sale() -> Decimal {
        dec!(500)
    }

    /// A typical booking purchase price
    pub fn purchase() -> Decimal {
        dec!(300)
    }

    /// A typical receipt amount
    pub fn receipt() -> Decimal {
        dec!(100)
    }
}

/// Fixture for dates and months
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// 2024-03-15, midday UTC
    pub fn march_15() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    /// 2024-05-02, midday UTC
    pub fn may_2() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
    }

    /// 2024-06-01, midday UTC
    pub fn june_1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    pub fn march() -> MonthId {
        "2024-03".parse().unwrap()
    }

    pub fn may() -> MonthId {
        "2024-05".parse().unwrap()
    }

    pub fn june() -> MonthId {
        "2024-06".parse().unwrap()
    }
}

/// Fixture for account registries
pub struct RegistryFixtures;

impl RegistryFixtures {
    /// Standard chart plus the party accounts the scenarios need:
    /// client receivables for both fixture companies and one supplier.
    pub fn with_parties() -> AccountRegistry {
        AccountRegistry::standard_with(vec![
            Account::new(
                AccountId::new(),
                "1110",
                "Client C1",
                AccountGroup::Receivables,
            )
            .with_reference(AccountRef::Client(*COMPANY_C1)),
            Account::new(
                AccountId::new(),
                "1120",
                "Client C2",
                AccountGroup::Receivables,
            )
            .with_reference(AccountRef::Client(*COMPANY_C2)),
            Account::new(AccountId::new(), "2110", "Acme Air", AccountGroup::Payables)
                .with_reference(AccountRef::Supplier("acme".into())),
        ])
        .expect("fixture registry is duplicate-free")
    }
}
