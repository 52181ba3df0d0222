//! Errors surfaced by the ledger and the reconciliation flows.

use thiserror::Error;

use stockwise_core::DomainError;

use crate::document_store::StoreError;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A referenced product, record or order does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected before any IO (missing field, negative quantity, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The store rejected a read or the batch; nothing was applied.
    #[error("commit failed: {0}")]
    CommitFailure(#[source] StoreError),

    /// Version preconditions kept failing because of concurrent writers.
    #[error("concurrent modification after {attempts} attempt(s): {detail}")]
    ConcurrentModification { attempts: u32, detail: String },
}

impl ReconcileError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::ConcurrentModification { .. })
    }
}

impl From<DomainError> for ReconcileError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ReconcileError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => ReconcileError::InvariantViolation(msg),
            DomainError::NotFound(what) => ReconcileError::NotFound(what),
            DomainError::Conflict(detail) => {
                ReconcileError::ConcurrentModification { attempts: 1, detail }
            }
        }
    }
}

impl From<StoreError> for ReconcileError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { .. } => ReconcileError::ConcurrentModification {
                attempts: 1,
                detail: value.to_string(),
            },
            other => ReconcileError::CommitFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwise_core::ExpectedVersion;

    #[test]
    fn store_conflict_maps_to_concurrent_modification() {
        let err: ReconcileError = StoreError::Conflict {
            collection: "products".into(),
            id: "p".into(),
            expected: ExpectedVersion::Exact(1),
            actual: 2,
        }
        .into();
        assert!(err.is_conflict());
    }

    #[test]
    fn other_store_errors_are_commit_failures() {
        let err: ReconcileError = StoreError::Unavailable("offline".into()).into();
        assert!(matches!(err, ReconcileError::CommitFailure(StoreError::Unavailable(_))));
    }

    #[test]
    fn domain_errors_keep_their_category() {
        assert!(matches!(
            ReconcileError::from(DomainError::validation("x")),
            ReconcileError::Validation(_)
        ));
        assert!(matches!(
            ReconcileError::from(DomainError::not_found("product")),
            ReconcileError::NotFound(_)
        ));
    }
}
