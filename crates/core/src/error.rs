//! Domain error model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, policy, conflicts). Storage and transport failures belong to the
/// infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, missing required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record does not exist or is not eligible for the operation.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A commercial rule rejected the request.
    #[error("policy violation: {0}")]
    Policy(PolicyViolation),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Stable machine-readable code; policy errors report their reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::InvalidId(_) => "invalid_id",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Policy(v) => v.code(),
        }
    }
}

impl From<PolicyViolation> for DomainError {
    fn from(value: PolicyViolation) -> Self {
        Self::Policy(value)
    }
}

/// Business-rule breach with a stable reason code.
///
/// Every variant carries the limit that was crossed so callers can render an
/// actionable message without re-reading the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum PolicyViolation {
    DiscountExceedsCap {
        requested: Decimal,
        cap: Decimal,
    },
    BelowMinimumPrice {
        effective_price: Decimal,
        minimum_price: Decimal,
    },
    BelowMoq {
        requested: Decimal,
        minimum: Decimal,
    },
    /// Only raised when the stock-shortfall policy is configured to reject.
    InsufficientStock {
        requested: Decimal,
        on_hand: Decimal,
    },
}

impl PolicyViolation {
    /// Stable reason code (safe to persist or match on in clients).
    pub fn code(&self) -> &'static str {
        match self {
            PolicyViolation::DiscountExceedsCap { .. } => "discount_exceeds_cap",
            PolicyViolation::BelowMinimumPrice { .. } => "below_minimum_price",
            PolicyViolation::BelowMoq { .. } => "below_moq",
            PolicyViolation::InsufficientStock { .. } => "insufficient_stock",
        }
    }
}

impl core::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PolicyViolation::DiscountExceedsCap { requested, cap } => write!(
                f,
                "{}: requested discount {requested}% exceeds cap {cap}%",
                self.code()
            ),
            PolicyViolation::BelowMinimumPrice {
                effective_price,
                minimum_price,
            } => write!(
                f,
                "{}: effective price {effective_price} is below floor {minimum_price}",
                self.code()
            ),
            PolicyViolation::BelowMoq { requested, minimum } => write!(
                f,
                "{}: quantity {requested} is below minimum order quantity {minimum}",
                self.code()
            ),
            PolicyViolation::InsufficientStock { requested, on_hand } => write!(
                f,
                "{}: quantity {requested} exceeds on-hand stock {on_hand}",
                self.code()
            ),
        }
    }
}
