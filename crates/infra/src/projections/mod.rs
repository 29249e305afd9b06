//! Read models built from ledger envelopes.
//!
//! Projections are rebuildable from the event store, tenant-isolated and
//! idempotent under at-least-once delivery.

pub mod inventory_valuation;

pub use inventory_valuation::{
    InventoryValuation, InventoryValuationError, InventoryValuationProjection,
    InventoryValuationSummary,
};
