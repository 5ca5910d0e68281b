//! Optimistic transactions
//!
//! A transaction records the version of every document it reads and stages
//! its writes locally. Commit re-checks the recorded versions under the
//! store's write lock: if any read document changed since it was observed,
//! nothing is applied and the commit fails with `TransactionConflict`, which
//! callers retry with backoff.
//!
//! Staged increments are blind: they do not join the read set, so they are
//! applied additively at commit without contending on the document version.
//! This keeps sharded-counter updates inside the voucher transaction without
//! reintroducing the hot-document contention the sharding avoids.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

use crate::error::StoreError;
use crate::store::{increment_field, Store, VersionedDoc};

enum WriteOp {
    Put {
        collection: String,
        id: String,
        body: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: rust_decimal::Decimal,
    },
}

/// An in-flight optimistic transaction
///
/// Obtained from [`Store::begin`]. Dropping a transaction without committing
/// discards all staged writes; a failed commit leaves the store untouched.
pub struct Transaction {
    store: Store,
    reads: HashMap<(String, String), u64>,
    writes: Vec<WriteOp>,
}

impl Transaction {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            writes: Vec::new(),
        }
    }

    /// Reads a document inside the transaction
    ///
    /// The observed version joins the read set; commit fails if the document
    /// changes before then. Reads see this transaction's own staged puts and
    /// deletes, but not its staged increments.
    pub async fn get<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        for op in self.writes.iter().rev() {
            match op {
                WriteOp::Put {
                    collection: c,
                    id: i,
                    body,
                } if c == collection && i == id => {
                    return Ok(Some(serde_json::from_value(body.clone())?));
                }
                WriteOp::Delete {
                    collection: c,
                    id: i,
                } if c == collection && i == id => return Ok(None),
                _ => {}
            }
        }

        let observed = self.store.get_raw(collection, id).await?;
        let key = (collection.to_string(), id.to_string());
        let version = observed.as_ref().map(|(v, _)| *v).unwrap_or(0);
        self.reads.entry(key).or_insert(version);

        match observed {
            Some((_, body)) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Stages a document write
    pub fn put<T: Serialize>(
        &mut self,
        collection: &str,
        id: &str,
        body: &T,
    ) -> Result<(), StoreError> {
        self.writes.push(WriteOp::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            body: serde_json::to_value(body)?,
        });
        Ok(())
    }

    /// Stages a document deletion
    pub fn delete(&mut self, collection: &str, id: &str) {
        self.writes.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    /// Stages a blind numeric increment
    pub fn increment(
        &mut self,
        collection: &str,
        id: &str,
        field: &str,
        delta: rust_decimal::Decimal,
    ) {
        self.writes.push(WriteOp::Increment {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            delta,
        });
    }

    /// Commits the transaction
    ///
    /// All staged writes apply together, or none do: the final state of
    /// every touched document is computed first, so a malformed increment
    /// target aborts the commit before anything is mutated.
    ///
    /// # Errors
    ///
    /// Returns `TransactionConflict` if any document in the read set changed
    /// since it was observed.
    pub async fn commit(self) -> Result<(), StoreError> {
        let store = self.store.clone();
        let mut guard = store.write_lock("commit").await?;

        for ((collection, id), observed) in &self.reads {
            let current = guard
                .get(collection)
                .and_then(|c| c.get(id))
                .map(|doc| doc.version)
                .unwrap_or(0);
            if current != *observed {
                trace!(collection = %collection, id = %id, "Commit lost version race");
                return Err(StoreError::conflict(collection, id));
            }
        }

        // Resulting body per touched document; None marks a deletion.
        let mut staged: HashMap<(String, String), Option<Value>> = HashMap::new();

        for op in &self.writes {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    body,
                } => {
                    staged.insert((collection.clone(), id.clone()), Some(body.clone()));
                }
                WriteOp::Delete { collection, id } => {
                    staged.insert((collection.clone(), id.clone()), None);
                }
                WriteOp::Increment {
                    collection,
                    id,
                    field,
                    delta,
                } => {
                    let key = (collection.clone(), id.clone());
                    let base = match staged.get(&key) {
                        Some(body) => body.clone(),
                        None => guard
                            .get(collection)
                            .and_then(|c| c.get(id))
                            .map(|doc| doc.body.clone()),
                    };
                    let mut body =
                        base.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                    increment_field(&mut body, id, field, *delta)?;
                    staged.insert(key, Some(body));
                }
            }
        }

        for ((collection, id), body) in staged {
            match body {
                Some(body) => {
                    let coll = guard.entry(collection).or_default();
                    let version = coll.get(&id).map(|d| d.version).unwrap_or(0) + 1;
                    coll.insert(id, VersionedDoc { version, body });
                }
                None => {
                    if let Some(coll) = guard.get_mut(&collection) {
                        coll.remove(&id);
                    }
                }
            }
        }

        Ok(())
    }
}
