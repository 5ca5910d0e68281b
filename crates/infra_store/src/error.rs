//! Store error types
//!
//! This module defines the error types that can occur during document store
//! operations, providing meaningful error messages and a transient/permanent
//! classification that callers use to decide whether to retry.

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Optimistic transaction commit lost a race with a concurrent writer
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// The operation did not complete within the caller-supplied timeout
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Document body could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document body has an unexpected shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    /// Creates a not found error for a specific collection and identifier
    pub fn not_found(collection: &str, id: impl std::fmt::Display) -> Self {
        StoreError::NotFound(format!("{}/{}", collection, id))
    }

    /// Creates a conflict error naming the contended document
    pub fn conflict(collection: &str, id: impl std::fmt::Display) -> Self {
        StoreError::TransactionConflict(format!("{}/{}", collection, id))
    }

    /// Returns true if this error indicates a transient failure that may
    /// succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::TransactionConflict(_)
                | StoreError::Timeout { .. }
        )
    }

    /// Returns true if this error indicates a document was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}
