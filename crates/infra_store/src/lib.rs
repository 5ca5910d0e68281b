//! Infrastructure Store - document store client for the travel ledger
//!
//! This crate provides the storage layer the ledger runs on: a document
//! store offering atomic single-document field increments and multi-document
//! optimistic transactions. The client is constructed explicitly and passed
//! to each component; there is no global instance.

pub mod error;
pub mod store;
pub mod txn;

pub use error::StoreError;
pub use store::{backoff_delay, Store, StoreConfig};
pub use txn::Transaction;
