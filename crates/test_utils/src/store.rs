//! Store helpers for tests

use std::time::Duration;

use infra_store::{Store, StoreConfig};

/// Creates a fresh store tuned for tests: short timeouts and fast retries
pub fn test_store() -> Store {
    Store::new(
        StoreConfig::new("test-ledger")
            .op_timeout(Duration::from_secs(5))
            .max_txn_attempts(5)
            .retry_base_delay(Duration::from_millis(1)),
    )
}
