//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::{DateTime, Utc};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{CompanyId, Currency};
use domain_ledger::{SourceRecord, SourceType};

use crate::fixtures::{AmountFixtures, TemporalFixtures, COMPANY_C1};

/// Builder for business source records
pub struct SourceRecordBuilder {
    source_id: String,
    source_type: SourceType,
    company_id: CompanyId,
    date: DateTime<Utc>,
    currency: Currency,
    sale_price: Decimal,
    purchase_price: Decimal,
    supplier: Option<String>,
}

impl Default for SourceRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRecordBuilder {
    /// Creates a builder for a typical booking of company C1
    pub fn new() -> Self {
        Self {
            source_id: "bk-1".to_string(),
            source_type: SourceType::Booking,
            company_id: *COMPANY_C1,
            date: TemporalFixtures::may_2(),
            currency: Currency::USD,
            sale_price: AmountFixtures::sale(),
            purchase_price: AmountFixtures::purchase(),
            supplier: Some("acme".to_string()),
        }
    }

    pub fn with_source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = id.into();
        self
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_sale_price(mut self, sale_price: Decimal) -> Self {
        self.sale_price = sale_price;
        self
    }

    pub fn with_purchase_price(mut self, purchase_price: Decimal) -> Self {
        self.purchase_price = purchase_price;
        self
    }

    pub fn with_supplier(mut self, supplier: Option<String>) -> Self {
        self.supplier = supplier;
        self
    }

    /// Builds the source record, with a generated description
    pub fn build(self) -> SourceRecord {
        SourceRecord {
            source_id: self.source_id,
            source_type: self.source_type,
            company_id: self.company_id,
            date: self.date,
            currency: self.currency,
            sale_price: self.sale_price,
            purchase_price: self.purchase_price,
            supplier: self.supplier,
            description: Some(Sentence(3..6).fake()),
        }
    }
}
