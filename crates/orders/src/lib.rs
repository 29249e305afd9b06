//! Order line validation.
//!
//! Stateless validate-and-compute over freshly loaded state: a resolved price,
//! the product's cost state and its packaging profile. Nothing the client
//! suggests (price, discount defaults) is trusted; every submission is checked
//! again from scratch.

pub mod draft;
pub mod line;
pub mod policy;
pub mod validator;

pub use draft::{LineOutcome, OrderDraft, OrderValidation};
pub use line::{LineRequest, LineWarning, OrderLine, OrderType};
pub use policy::{StockShortfallPolicy, ValidationPolicy};
pub use validator::{LineInputs, validate_line};
