//! Sharded atomic counters
//!
//! A single hot counter document under write skew serializes every writer
//! and turns transaction retries into the common case. Spreading the total
//! across N independent shard documents makes contention O(writers/N) per
//! shard; the visible value is the sum across shards, so no single shard is
//! ever authoritative.
//!
//! The shard count is static configuration. Resizing would require a
//! migration that redistributes historical totals, which is out of scope.

use rand::Rng;
use rust_decimal::Decimal;
use tracing::trace;

use infra_store::{Store, StoreError, Transaction};

/// Default number of shards per counter
pub const DEFAULT_SHARD_COUNT: u32 = 32;

/// Collection holding every counter shard document
const COUNTERS: &str = "counters";
/// Field each shard accumulates into
const VALUE_FIELD: &str = "value";

/// Scalable counter spread over N shard documents
#[derive(Debug, Clone)]
pub struct ShardedCounter {
    store: Store,
    shards: u32,
}

impl ShardedCounter {
    /// Creates a counter client with the default shard count
    pub fn new(store: Store) -> Self {
        Self {
            store,
            shards: DEFAULT_SHARD_COUNT,
        }
    }

    /// Overrides the shard count (static per deployment)
    pub fn with_shards(mut self, shards: u32) -> Self {
        self.shards = shards.max(1);
        self
    }

    /// Number of shards per counter
    pub fn shards(&self) -> u32 {
        self.shards
    }

    fn shard_doc_id(counter_id: &str, shard: u32) -> String {
        format!("{}#{:02}", counter_id, shard)
    }

    fn pick_shard(&self) -> u32 {
        rand::thread_rng().gen_range(0..self.shards)
    }

    /// Adds `delta` to one uniformly chosen shard
    ///
    /// A single atomic document increment; deliberately not transactional,
    /// since wrapping it in a larger transaction would reintroduce the
    /// contention the sharding avoids.
    pub async fn increment(&self, counter_id: &str, delta: Decimal) -> Result<(), StoreError> {
        if delta.is_zero() {
            return Ok(());
        }
        let shard = self.pick_shard();
        trace!(counter_id, shard, %delta, "Counter increment");
        self.store
            .increment(COUNTERS, &Self::shard_doc_id(counter_id, shard), VALUE_FIELD, delta)
            .await?;
        Ok(())
    }

    /// Stages the same increment into a caller-owned transaction
    ///
    /// The increment is blind: it joins the transaction's atomicity without
    /// joining its read set, so concurrent postings do not conflict on the
    /// shard document.
    pub fn increment_in(&self, tx: &mut Transaction, counter_id: &str, delta: Decimal) {
        if delta.is_zero() {
            return;
        }
        let shard = self.pick_shard();
        trace!(counter_id, shard, %delta, "Counter increment (staged)");
        tx.increment(COUNTERS, &Self::shard_doc_id(counter_id, shard), VALUE_FIELD, delta);
    }

    /// Sums all shards of a counter
    ///
    /// N point reads; not snapshot-consistent under concurrent writers,
    /// which is the accepted trade-off for rollup reads.
    pub async fn read(&self, counter_id: &str) -> Result<Decimal, StoreError> {
        let mut total = Decimal::ZERO;
        for shard in 0..self.shards {
            let doc: Option<ShardDoc> = self
                .store
                .get(COUNTERS, &Self::shard_doc_id(counter_id, shard))
                .await?;
            if let Some(doc) = doc {
                total += doc.value;
            }
        }
        Ok(total)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ShardDoc {
    #[serde(default)]
    value: Decimal,
}
