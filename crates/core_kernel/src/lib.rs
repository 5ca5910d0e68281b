//! Core Kernel - Foundational types and utilities for the travel ledger
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Calendar-month and timezone types for period bucketing
//! - Common identifiers and value objects

pub mod error;
pub mod identifiers;
pub mod money;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{AccountId, ActorId, AuditEventId, CompanyId, EntryId, VoucherId};
pub use money::{Currency, Money, MoneyError};
pub use temporal::{MonthId, TemporalError, Timezone};
