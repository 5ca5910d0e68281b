//! Rollup Domain - Sharded Counters and Monthly Aggregates
//!
//! This crate keeps the per-company, per-month rollups (revenue, cost,
//! profit, bookings count) consistent without serializing concurrent
//! writers through one counter document. Writes land on sharded counters;
//! the [`AggregationSink`] plugs into the ledger's event interface so every
//! voucher mutation and its aggregate deltas commit in one transaction.

pub mod counter;
pub mod period;
pub mod sink;

pub use counter::{ShardedCounter, DEFAULT_SHARD_COUNT};
pub use period::{PeriodAggregate, PeriodAggregator, PeriodDeltas};
pub use sink::AggregationSink;
