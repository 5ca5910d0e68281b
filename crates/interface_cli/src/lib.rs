//! Interface CLI - operator-facing entry points for the travel ledger
//!
//! The business screens that drive posting live elsewhere; this crate owns
//! what an operator runs by hand: configuration loading, component wiring,
//! and the audit jobs binary.

pub mod config;
pub mod context;

pub use config::LedgerConfig;
pub use context::AppContext;
