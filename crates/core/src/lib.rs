//! `pricewise-core`: domain foundation building blocks.
//!
//! Pure primitives shared by the catalog, valuation, pricing and order crates
//! (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, PolicyViolation};
pub use id::{AggregateId, TenantId};
pub use value_object::{Override, Percent, ValueObject};
