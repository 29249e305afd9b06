//! Price resolution.
//!
//! A pure precedence cascade over catalog records the caller has already
//! loaded: party-assigned list, then the tenant's default list, then the
//! product's own fallback price.

pub mod quote;
pub mod resolver;

pub use quote::{PriceQuote, PriceSource};
pub use resolver::{ListCandidate, PricingContext, resolve};
