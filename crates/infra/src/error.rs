//! Errors surfaced at the engine boundary.

use pricewise_core::{DomainError, PolicyViolation};
use thiserror::Error;

use crate::event_store::EventStoreError;

/// Engine-level error returned to callers (order entry, warehouse ops, APIs).
///
/// Every variant is a rejected operation with unchanged prior state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed input or a data-integrity problem in catalog records.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced record missing, inactive or not eligible.
    #[error("not found: {0}")]
    NotFound(String),

    /// Commercial rule breach (blocking).
    #[error("policy violation: {0}")]
    Policy(PolicyViolation),

    /// Lost-update race on a ledger stream; re-read and re-apply.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// Transient store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Cross-tenant access attempt or mixed-tenant data from a store.
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),
}

impl EngineError {
    /// Whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Concurrency(_) | EngineError::Persistence(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::NotFound(_) => "not_found",
            EngineError::Policy(v) => v.code(),
            EngineError::Concurrency(_) => "concurrency_conflict",
            EngineError::Persistence(_) => "persistence",
            EngineError::TenantIsolation(_) => "tenant_isolation",
        }
    }

    pub fn policy(&self) -> Option<&PolicyViolation> {
        match self {
            EngineError::Policy(v) => Some(v),
            _ => None,
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                EngineError::Validation(msg)
            }
            // Invariant breaches reach the boundary only through malformed requests
            // (mismatched ids, wrong tenant) or bad catalog data.
            DomainError::InvariantViolation(msg) => EngineError::Validation(msg),
            DomainError::NotFound(what) => EngineError::NotFound(what),
            // Aggregate-level conflicts (a movement id posted twice) do not go
            // away on retry; only store version mismatches are races.
            DomainError::Conflict(msg) => EngineError::Validation(msg),
            DomainError::Policy(v) => EngineError::Policy(v),
        }
    }
}

impl From<EventStoreError> for EngineError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => EngineError::Concurrency(msg),
            EventStoreError::TenantIsolation(msg) => EngineError::TenantIsolation(msg),
            other => EngineError::Persistence(other.to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
