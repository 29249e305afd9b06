use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_catalog::{ListType, ProductId};
use pricewise_core::{Override, Percent};
use pricewise_pricing::PriceSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Sales,
    Purchase,
}

impl OrderType {
    pub fn list_type(self) -> ListType {
        match self {
            OrderType::Sales => ListType::Sales,
            OrderType::Purchase => ListType::Purchase,
        }
    }
}

/// One proposed line as submitted by order entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: Decimal,
    /// Requested discount, `0..=100`.
    pub discount_percent: Decimal,
}

impl LineRequest {
    pub fn new(product_id: ProductId, quantity: Decimal) -> Self {
        Self {
            product_id,
            quantity,
            discount_percent: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, percent: Decimal) -> Self {
        self.discount_percent = percent;
        self
    }
}

/// Non-blocking findings attached to an accepted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum LineWarning {
    InsufficientStock {
        requested: Decimal,
        on_hand: Decimal,
    },
    PackagingMisaligned {
        pieces_per_carton: u64,
        pieces_per_pallet: Option<u64>,
    },
}

impl LineWarning {
    pub fn code(&self) -> &'static str {
        match self {
            LineWarning::InsufficientStock { .. } => "insufficient_stock",
            LineWarning::PackagingMisaligned { .. } => "packaging_misaligned",
        }
    }
}

/// A validated order line with its computed amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Quoted unit price before discount.
    pub unit_price: Decimal,
    pub discount_percent: Percent,
    pub effective_unit_price: Decimal,
    pub gross: Decimal,
    pub discount_amount: Decimal,
    pub subtotal: Decimal,
    pub source: PriceSource,
    pub commission_percent: Override<Percent>,
    /// For margin display only; never feeds back into price.
    pub effective_cost: Option<Override<Decimal>>,
    pub margin_percent: Option<Decimal>,
    pub warnings: Vec<LineWarning>,
}

impl OrderLine {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn price_tier(&self) -> u8 {
        self.source.tier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_maps_to_list_type() {
        assert_eq!(OrderType::Sales.list_type(), ListType::Sales);
        assert_eq!(OrderType::Purchase.list_type(), ListType::Purchase);
    }

    #[test]
    fn warnings_serialize_with_code() {
        let w = LineWarning::PackagingMisaligned {
            pieces_per_carton: 100,
            pieces_per_pallet: None,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["code"], w.code());
        assert_eq!(json["pieces_per_carton"], 100);
    }
}
