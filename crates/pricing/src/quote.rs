use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_catalog::{ListType, PriceListEntryId, PriceListId, ProductId};
use pricewise_core::{Override, Percent};

/// Where a quoted price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceSource {
    /// List assigned to the requesting party.
    PartyList {
        price_list_id: PriceListId,
        entry_id: PriceListEntryId,
    },
    /// Tenant's default list for the list type.
    DefaultList {
        price_list_id: PriceListId,
        entry_id: PriceListEntryId,
    },
    /// Product base price (sales) or purchase reference price (purchase).
    ProductFallback,
}

impl PriceSource {
    /// Precedence tier, 1 (highest) to 3.
    pub fn tier(&self) -> u8 {
        match self {
            PriceSource::PartyList { .. } => 1,
            PriceSource::DefaultList { .. } => 2,
            PriceSource::ProductFallback => 3,
        }
    }

    pub fn entry_id(&self) -> Option<PriceListEntryId> {
        match self {
            PriceSource::PartyList { entry_id, .. } | PriceSource::DefaultList { entry_id, .. } => {
                Some(*entry_id)
            }
            PriceSource::ProductFallback => None,
        }
    }
}

/// Resolved unit price with the commercial limits that apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub product_id: ProductId,
    pub list_type: ListType,
    pub price: Decimal,
    /// Zero when the entry sets no floor.
    pub minimum_price: Decimal,
    pub max_discount_percent: Percent,
    pub commission_percent: Override<Percent>,
    pub source: PriceSource,
}

impl PriceQuote {
    /// Unit price after a percentage discount; `None` on `Decimal` overflow.
    pub fn discounted_price(&self, discount: Percent) -> Option<Decimal> {
        self.price.checked_mul(discount.complement_factor())
    }
}
