//! Engine error taxonomy.
//!
//! Deterministic rejections (`Validation`, `OverAllocation`,
//! `ConsistencyViolation`) fail immediately with no partial writes.
//! `StateConflict` is retried internally against fresh balances before it
//! surfaces. `Storage` always rolls back and is never retried automatically,
//! because retrying a payment write risks duplication.

use thiserror::Error;

use credit_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Bad input: non-positive amount, unknown customer, ineligible order.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Funds exceed what the eligible orders can absorb and the caller did
    /// not (or may not) hold the remainder as an advance.
    #[error("over-allocation: requested {requested}, allocatable {allocatable}")]
    OverAllocation { requested: u64, allocatable: u64 },

    /// A client-assigned idempotency key was seen before for this customer.
    #[error("duplicate payment submission (idempotency key '{0}')")]
    DuplicatePayment(String),

    /// Concurrent mutation invalidated the computed allocation and retries
    /// were exhausted.
    #[error("state conflict after {attempts} attempts: {reason}")]
    StateConflict { attempts: u32, reason: String },

    /// A programming-level fault (e.g. journal lines failed to balance).
    /// Never coerced, never retried.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The atomic unit of work could not be committed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::NotFound => EngineError::Validation("not found".to_string()),
            // Deterministic domain conflicts (e.g. double reversal) are
            // rejections, not retryable races.
            DomainError::Conflict(msg) => EngineError::Validation(msg),
            DomainError::InvariantViolation(msg) => EngineError::ConsistencyViolation(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => EngineError::StateConflict {
                attempts: 1,
                reason,
            },
            StoreError::DuplicateKey(key) => EngineError::DuplicatePayment(key),
            StoreError::InvalidCommit(msg) => EngineError::ConsistencyViolation(msg),
            StoreError::Storage(msg) => EngineError::Storage(msg),
        }
    }
}
