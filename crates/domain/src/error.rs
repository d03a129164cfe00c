//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested entity does not exist.
    NotFound,
    /// Caller input violates a business rule.
    Validation,
    /// Storage or transaction failure; the only retryable kind.
    Infrastructure,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A persisted row holds a value the domain cannot interpret.
    #[error("Invalid {entity} record {id}: {reason}")]
    InvalidRecord {
        entity: &'static str,
        id: i64,
        reason: String,
    },
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Order(err) => err.kind(),
            DomainError::Store(_) | DomainError::InvalidRecord { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::Order(err) => err.reason(),
            DomainError::Store(_) => "store",
            DomainError::InvalidRecord { .. } => "invalid_record",
        }
    }
}
