//! Document store client
//!
//! This module provides the store handle and its configuration. The store is
//! a document database: named collections of JSON documents, each carrying a
//! version counter used for optimistic concurrency. Two access paths exist:
//!
//! - single-document operations (`get`, `put`, `delete`, `increment`), each
//!   atomic on its own;
//! - multi-document transactions (`begin`), which commit with a version
//!   check and fail with `TransactionConflict` under contention.
//!
//! The handle is cheap to clone and is passed to each component at
//! construction time; no global instance exists.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::txn::Transaction;

/// Configuration options for the store client
///
/// # Example
///
/// ```rust
/// use infra_store::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::new("ledger")
///     .op_timeout(Duration::from_secs(5))
///     .max_txn_attempts(8);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Logical database name, used in log output
    pub name: String,
    /// Per-operation timeout
    pub op_timeout: Duration,
    /// Maximum optimistic transaction attempts before giving up
    pub max_txn_attempts: u32,
    /// Base delay for exponential retry backoff
    pub retry_base_delay: Duration,
}

impl StoreConfig {
    /// Creates a new configuration with sensible defaults
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_timeout: Duration::from_secs(30),
            max_txn_attempts: 5,
            retry_base_delay: Duration::from_millis(20),
        }
    }

    /// Sets the per-operation timeout (default: 30s)
    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Sets the maximum transaction attempts (default: 5)
    pub fn max_txn_attempts(mut self, attempts: u32) -> Self {
        self.max_txn_attempts = attempts;
        self
    }

    /// Sets the retry backoff base delay (default: 20ms)
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("ledger")
    }
}

/// A versioned document as held by the store
#[derive(Debug, Clone)]
pub(crate) struct VersionedDoc {
    pub version: u64,
    pub body: Value,
}

pub(crate) type Collections = HashMap<String, HashMap<String, VersionedDoc>>;

pub(crate) struct Inner {
    pub config: StoreConfig,
    pub collections: RwLock<Collections>,
}

/// Cloneable handle to the document store
///
/// Components hold their own clone of the handle; lifecycle is owned by the
/// process entry point that constructed it.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<Inner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.name)
            .finish()
    }
}

impl Store {
    /// Creates a new empty store with the given configuration
    pub fn new(config: StoreConfig) -> Self {
        debug!(name = %config.name, "Creating store client");
        Self {
            inner: Arc::new(Inner {
                config,
                collections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Creates a store with default configuration, for tests and tools
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Returns the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Starts a new optimistic transaction
    pub fn begin(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Reads a document, deserializing its body
    ///
    /// Returns `Ok(None)` if the document does not exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.get_raw(collection, id).await? {
            Some((_, body)) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Reads a document's version and raw body
    pub(crate) async fn get_raw(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<(u64, Value)>, StoreError> {
        let guard = self.read_lock("get").await?;
        Ok(guard
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|doc| (doc.version, doc.body.clone())))
    }

    /// Writes a document unconditionally, outside any transaction
    ///
    /// Used by seeding tools and collaborators that own their documents
    /// outright; ledger mutations go through transactions instead.
    pub async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        body: &T,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(body)?;
        let mut guard = self.write_lock("put").await?;
        let coll = guard.entry(collection.to_string()).or_default();
        let version = coll.get(id).map(|d| d.version).unwrap_or(0) + 1;
        coll.insert(id.to_string(), VersionedDoc { version, body });
        Ok(())
    }

    /// Deletes a document unconditionally, outside any transaction
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.write_lock("delete").await?;
        if let Some(coll) = guard.get_mut(collection) {
            coll.remove(id);
        }
        Ok(())
    }

    /// Returns every document in a collection, as of a single snapshot
    ///
    /// Batch scans (chart builds, audits) use this; the snapshot is taken at
    /// call time and concurrent writers are simply picked up by the next run.
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<(String, T)>, StoreError> {
        let snapshot: Vec<(String, Value)> = {
            let guard = self.read_lock("list").await?;
            guard
                .get(collection)
                .map(|c| {
                    c.iter()
                        .map(|(id, doc)| (id.clone(), doc.body.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut out = Vec::with_capacity(snapshot.len());
        for (id, body) in snapshot {
            out.push((id, serde_json::from_value(body)?));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Atomically adds `delta` to a numeric field of a single document
    ///
    /// Creates the document and the field as needed. This is the only
    /// mutation sharded-counter writers issue, so hot counters never pass
    /// through the transaction conflict path.
    pub async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: rust_decimal::Decimal,
    ) -> Result<rust_decimal::Decimal, StoreError> {
        let mut guard = self.write_lock("increment").await?;
        let coll = guard.entry(collection.to_string()).or_default();
        apply_increment(coll, id, field, delta)
    }

    async fn read_lock(
        &self,
        operation: &str,
    ) -> Result<tokio::sync::RwLockReadGuard<'_, Collections>, StoreError> {
        let timeout = self.inner.config.op_timeout;
        tokio::time::timeout(timeout, self.inner.collections.read())
            .await
            .map_err(|_| StoreError::Timeout {
                operation: operation.to_string(),
                duration_ms: timeout.as_millis() as u64,
            })
    }

    pub(crate) async fn write_lock(
        &self,
        operation: &str,
    ) -> Result<tokio::sync::RwLockWriteGuard<'_, Collections>, StoreError> {
        let timeout = self.inner.config.op_timeout;
        tokio::time::timeout(timeout, self.inner.collections.write())
            .await
            .map_err(|_| StoreError::Timeout {
                operation: operation.to_string(),
                duration_ms: timeout.as_millis() as u64,
            })
    }
}

/// Adds `delta` to `field` of document `id`, creating either as needed
pub(crate) fn apply_increment(
    coll: &mut HashMap<String, VersionedDoc>,
    id: &str,
    field: &str,
    delta: rust_decimal::Decimal,
) -> Result<rust_decimal::Decimal, StoreError> {
    let doc = coll.entry(id.to_string()).or_insert_with(|| VersionedDoc {
        version: 0,
        body: Value::Object(serde_json::Map::new()),
    });

    let next = increment_field(&mut doc.body, id, field, delta)?;
    doc.version += 1;
    Ok(next)
}

/// Adds `delta` to a numeric field of a document body
pub(crate) fn increment_field(
    body: &mut Value,
    id: &str,
    field: &str,
    delta: rust_decimal::Decimal,
) -> Result<rust_decimal::Decimal, StoreError> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidDocument(format!("{} is not an object", id)))?;

    let current = match obj.get(field) {
        None | Some(Value::Null) => rust_decimal::Decimal::ZERO,
        Some(value) => decimal_from_value(value)
            .ok_or_else(|| StoreError::InvalidDocument(format!("{}.{} is not numeric", id, field)))?,
    };

    let next = current + delta;
    obj.insert(field.to_string(), serde_json::to_value(next)?);
    Ok(next)
}

/// Parses a stored JSON value as a decimal
///
/// Decimals serialize as strings; plain JSON numbers are accepted for
/// documents written by other tooling.
pub(crate) fn decimal_from_value(value: &Value) -> Option<rust_decimal::Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Computes the exponential backoff delay for a retry attempt
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(8))
}
