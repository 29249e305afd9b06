//! Valuation ledger (event-sourced).
//!
//! One stream per product. Every posted stock movement is an immutable event;
//! replaying the stream in sequence order rebuilds on-hand quantity, last cost
//! and the moving weighted-average cost. Pure domain logic: no IO.

pub mod cost;
pub mod ledger;
pub mod movement;

pub use cost::{effective_cost, margin_percent};
pub use ledger::{AGGREGATE_TYPE, CostLedger, CostState, PostMovement, ValuationCommand, ValuationEvent};
pub use movement::{MovementDirection, MovementId, StockMovement, WarehouseId};
