use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_core::{DomainError, DomainResult, Entity, Percent, TenantId, typed_id};

use crate::price_list::ListType;

typed_id!(ProductId, "Product identifier (tenant-scoped).");

/// Product lifecycle. Products are never hard-deleted while movements or order
/// lines reference them; archiving hides them from pricing instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

/// Catalog product as seen by the pricing engine.
///
/// Cost *state* (on-hand, last/average cost) is not stored here: it is owned by
/// the valuation ledger and only changes through posted movements.
/// `cost_override` is the one cost field catalog management may set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub code: String,
    pub name: String,
    pub status: ProductStatus,
    pub sellable: bool,
    pub purchasable: bool,
    /// Fallback sales price when no price list covers the product.
    pub base_price: Option<Decimal>,
    /// Purchase reference price; fallback purchase price and last-resort cost.
    pub purchase_price: Option<Decimal>,
    pub max_discount_percent: Option<Percent>,
    pub minimum_order_quantity: Option<Decimal>,
    pub reorder_lead_time_days: Option<u32>,
    pub default_commission_percent: Option<Percent>,
    /// Manually entered unit cost; wins over ledger-derived costs when set.
    pub cost_override: Option<Decimal>,
}

impl Product {
    /// Active, sellable and purchasable product with no prices configured.
    pub fn new(
        tenant_id: TenantId,
        id: ProductId,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            code: code.into(),
            name: name.into(),
            status: ProductStatus::Active,
            sellable: true,
            purchasable: true,
            base_price: None,
            purchase_price: None,
            max_discount_percent: None,
            minimum_order_quantity: None,
            reorder_lead_time_days: None,
            default_commission_percent: None,
            cost_override: None,
        }
    }

    pub fn with_base_price(mut self, price: Decimal) -> Self {
        self.base_price = Some(price);
        self
    }

    pub fn with_purchase_price(mut self, price: Decimal) -> Self {
        self.purchase_price = Some(price);
        self
    }

    pub fn with_max_discount(mut self, cap: Percent) -> Self {
        self.max_discount_percent = Some(cap);
        self
    }

    pub fn with_minimum_order_quantity(mut self, moq: Decimal) -> Self {
        self.minimum_order_quantity = Some(moq);
        self
    }

    pub fn with_cost_override(mut self, cost: Decimal) -> Self {
        self.cost_override = Some(cost);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Whether the product may appear on a list of the given type.
    pub fn is_eligible_for(&self, list_type: ListType) -> bool {
        self.is_active()
            && match list_type {
                ListType::Sales => self.sellable,
                ListType::Purchase => self.purchasable,
            }
    }

    /// Tier-3 price: base price for sales, purchase reference price for purchases.
    pub fn fallback_price(&self, list_type: ListType) -> Option<Decimal> {
        match list_type {
            ListType::Sales => self.base_price,
            ListType::Purchase => self.purchase_price,
        }
    }

    /// Product-level discount cap, 100% when unset.
    pub fn discount_cap(&self) -> Percent {
        self.max_discount_percent.unwrap_or(Percent::HUNDRED)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("product code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        for (field, value) in [
            ("base_price", self.base_price),
            ("purchase_price", self.purchase_price),
            ("cost_override", self.cost_override),
        ] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(DomainError::validation(format!("{field} cannot be negative")));
            }
        }
        if matches!(self.minimum_order_quantity, Some(q) if q <= Decimal::ZERO) {
            return Err(DomainError::validation(
                "minimum_order_quantity must be positive",
            ));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
