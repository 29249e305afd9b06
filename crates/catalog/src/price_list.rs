use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_core::{DomainError, DomainResult, Entity, Percent, TenantId, typed_id};

use crate::product::ProductId;

typed_id!(PriceListId, "Price list identifier (tenant-scoped).");
typed_id!(PriceListEntryId, "Price list entry identifier (tenant-scoped).");
typed_id!(PartyId, "Commercial party (customer/supplier) identifier.");

/// Which side of the business a list prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Sales,
    Purchase,
}

impl core::fmt::Display for ListType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ListType::Sales => f.write_str("sales"),
            ListType::Purchase => f.write_str("purchase"),
        }
    }
}

/// A named set of per-product prices for one list type.
///
/// At most one list per (tenant, list type) may be the default; stores enforce
/// that on write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub id: PriceListId,
    pub tenant_id: TenantId,
    pub name: String,
    pub list_type: ListType,
    pub default_commission_percent: Option<Percent>,
    pub is_default: bool,
    pub is_active: bool,
}

impl PriceList {
    pub fn new(
        tenant_id: TenantId,
        id: PriceListId,
        name: impl Into<String>,
        list_type: ListType,
    ) -> Self {
        Self {
            id,
            tenant_id,
            name: name.into(),
            list_type,
            default_commission_percent: None,
            is_default: false,
            is_active: true,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_commission(mut self, commission: Percent) -> Self {
        self.default_commission_percent = Some(commission);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("price list name cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for PriceList {
    type Id = PriceListId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// One product's price, floor, discount cap and commission within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListEntry {
    pub id: PriceListEntryId,
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub product_id: ProductId,
    pub price: Decimal,
    pub minimum_price: Option<Decimal>,
    /// When unset the product's own cap applies.
    pub max_discount_percent: Option<Percent>,
    pub commission_override_percent: Option<Percent>,
    /// Inclusive.
    pub valid_from: Option<NaiveDate>,
    /// Inclusive.
    pub valid_until: Option<NaiveDate>,
}

impl PriceListEntry {
    pub fn new(
        tenant_id: TenantId,
        price_list_id: PriceListId,
        product_id: ProductId,
        price: Decimal,
    ) -> Self {
        Self {
            id: PriceListEntryId::generate(),
            tenant_id,
            price_list_id,
            product_id,
            price,
            minimum_price: None,
            max_discount_percent: None,
            commission_override_percent: None,
            valid_from: None,
            valid_until: None,
        }
    }

    pub fn with_minimum_price(mut self, floor: Decimal) -> Self {
        self.minimum_price = Some(floor);
        self
    }

    pub fn with_max_discount(mut self, cap: Percent) -> Self {
        self.max_discount_percent = Some(cap);
        self
    }

    pub fn with_commission_override(mut self, commission: Percent) -> Self {
        self.commission_override_percent = Some(commission);
        self
    }

    pub fn with_window(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    /// `valid_from <= day <= valid_until`, open ends allowed.
    pub fn is_valid_on(&self, day: NaiveDate) -> bool {
        self.valid_from.is_none_or(|from| from <= day)
            && self.valid_until.is_none_or(|until| day <= until)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation("entry price cannot be negative"));
        }
        if let Some(floor) = self.minimum_price {
            if floor < Decimal::ZERO {
                return Err(DomainError::validation("minimum_price cannot be negative"));
            }
            if floor > self.price {
                return Err(DomainError::invariant(format!(
                    "minimum_price {floor} exceeds price {}",
                    self.price
                )));
            }
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err(DomainError::invariant(format!(
                    "valid_from {from} is after valid_until {until}"
                )));
            }
        }
        Ok(())
    }
}

impl Entity for PriceListEntry {
    type Id = PriceListEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Links a customer to the sales list that takes precedence for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPriceAssignment {
    pub tenant_id: TenantId,
    pub party_id: PartyId,
    pub price_list_id: PriceListId,
}
