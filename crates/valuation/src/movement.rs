use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_catalog::ProductId;
use pricewise_core::{TenantId, typed_id};
use pricewise_events::TenantScoped;

typed_id!(MovementId, "Stock movement identifier (unique per product stream).");
typed_id!(WarehouseId, "Warehouse identifier.");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Inbound,
    Outbound,
}

/// A posted stock movement. Never updated or deleted; corrections are new
/// compensating movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: Option<WarehouseId>,
    /// Signed: positive is inbound, negative is outbound. Never zero.
    pub quantity: Decimal,
    /// Present on inbound movements only.
    pub unit_cost: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

impl TenantScoped for StockMovement {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

impl StockMovement {
    pub fn direction(&self) -> MovementDirection {
        if self.quantity > Decimal::ZERO {
            MovementDirection::Inbound
        } else {
            MovementDirection::Outbound
        }
    }
}
