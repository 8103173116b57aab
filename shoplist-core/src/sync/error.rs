//! Sync error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the synchronization core and the feeds built on it.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A user-scoped operation was issued without a current user.
    #[error("No user is signed in")]
    NotAuthenticated,

    /// Any failure reported by the backing store.
    #[error("Backend error: {0}")]
    Backend(#[from] StoreError),

    /// The same id appeared twice within one reconciliation input.
    #[error("Duplicate id in collection: {id}")]
    ContractViolation { id: String },

    /// An operation referenced a position outside the collection.
    #[error("Operation index {index} out of range for collection of {len}")]
    InvalidOperation { index: usize, len: usize },

    /// User input rejected before reaching the store.
    #[error("{0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_wraps_store_error() {
        let err: SyncError = StoreError::NotFound("list abc".to_string()).into();
        assert!(matches!(err, SyncError::Backend(_)));
        assert_eq!(err.to_string(), "Backend error: Not found: list abc");
    }

    #[test]
    fn test_contract_violation_names_id() {
        let err = SyncError::ContractViolation {
            id: "dup".to_string(),
        };
        assert!(err.to_string().contains("dup"));
    }
}
