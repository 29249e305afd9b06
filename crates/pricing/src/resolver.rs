use chrono::NaiveDate;
use rust_decimal::Decimal;

use pricewise_catalog::{ListType, PriceList, PriceListEntry, Product};
use pricewise_core::{DomainError, DomainResult, Override, Percent};

use crate::quote::{PriceQuote, PriceSource};

/// A price list together with the product's entry on it, if any.
#[derive(Debug, Clone, Copy)]
pub struct ListCandidate<'a> {
    pub list: &'a PriceList,
    pub entry: Option<&'a PriceListEntry>,
}

impl<'a> ListCandidate<'a> {
    pub fn new(list: &'a PriceList, entry: Option<&'a PriceListEntry>) -> Self {
        Self { list, entry }
    }

    /// The entry, when the list is active, of the right type, and the entry
    /// covers this product on `day`.
    fn usable_entry(
        &self,
        product: &Product,
        list_type: ListType,
        day: NaiveDate,
    ) -> Option<&'a PriceListEntry> {
        if !self.list.is_active
            || self.list.list_type != list_type
            || self.list.tenant_id != product.tenant_id
        {
            return None;
        }
        self.entry.filter(|e| {
            e.price_list_id == self.list.id && e.product_id == product.id && e.is_valid_on(day)
        })
    }
}

/// Everything resolution reads, loaded by the caller from current state.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub product: &'a Product,
    pub list_type: ListType,
    /// List assigned to the requesting party; only consulted for sales.
    pub party_list: Option<ListCandidate<'a>>,
    pub default_list: Option<ListCandidate<'a>>,
    pub on: NaiveDate,
}

impl<'a> PricingContext<'a> {
    pub fn new(product: &'a Product, list_type: ListType, on: NaiveDate) -> Self {
        Self {
            product,
            list_type,
            party_list: None,
            default_list: None,
            on,
        }
    }

    pub fn with_party_list(mut self, candidate: ListCandidate<'a>) -> Self {
        self.party_list = Some(candidate);
        self
    }

    pub fn with_default_list(mut self, candidate: ListCandidate<'a>) -> Self {
        self.default_list = Some(candidate);
        self
    }
}

/// Resolve the applicable price; first matching tier wins.
pub fn resolve(ctx: &PricingContext<'_>) -> DomainResult<PriceQuote> {
    let product = ctx.product;

    if !product.is_eligible_for(ctx.list_type) {
        return Err(DomainError::not_found(format!(
            "product {} for {} pricing",
            product.id, ctx.list_type
        )));
    }

    let party = ctx
        .party_list
        .filter(|_| ctx.list_type == ListType::Sales)
        .and_then(|c| c.usable_entry(product, ctx.list_type, ctx.on).map(|e| (c.list, e)));
    if let Some((list, entry)) = party {
        let source = PriceSource::PartyList {
            price_list_id: list.id,
            entry_id: entry.id,
        };
        return Ok(quote_from_entry(product, ctx.list_type, list, entry, source));
    }

    let default = ctx
        .default_list
        .filter(|c| c.list.is_default)
        .and_then(|c| c.usable_entry(product, ctx.list_type, ctx.on).map(|e| (c.list, e)));
    if let Some((list, entry)) = default {
        let source = PriceSource::DefaultList {
            price_list_id: list.id,
            entry_id: entry.id,
        };
        return Ok(quote_from_entry(product, ctx.list_type, list, entry, source));
    }

    let price = product.fallback_price(ctx.list_type).ok_or_else(|| {
        DomainError::validation(format!(
            "product {} has no {} fallback price",
            product.id, ctx.list_type
        ))
    })?;

    Ok(PriceQuote {
        product_id: product.id,
        list_type: ctx.list_type,
        price,
        minimum_price: Decimal::ZERO,
        max_discount_percent: product.discount_cap(),
        commission_percent: Override::Auto(
            product.default_commission_percent.unwrap_or(Percent::ZERO),
        ),
        source: PriceSource::ProductFallback,
    })
}

fn quote_from_entry(
    product: &Product,
    list_type: ListType,
    list: &PriceList,
    entry: &PriceListEntry,
    source: PriceSource,
) -> PriceQuote {
    let derived_commission = list
        .default_commission_percent
        .or(product.default_commission_percent)
        .unwrap_or(Percent::ZERO);

    PriceQuote {
        product_id: product.id,
        list_type,
        price: entry.price,
        minimum_price: entry.minimum_price.unwrap_or_default(),
        max_discount_percent: entry
            .max_discount_percent
            .unwrap_or_else(|| product.discount_cap()),
        commission_percent: Override::resolve(entry.commission_override_percent, derived_commission),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewise_catalog::{PriceListId, ProductId, ProductStatus};
    use pricewise_core::TenantId;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pct(v: Decimal) -> Percent {
        Percent::new(v).unwrap()
    }

    struct Fixture {
        product: Product,
        default_list: PriceList,
        default_entry: PriceListEntry,
        party_list: PriceList,
        party_entry: PriceListEntry,
    }

    fn fixture() -> Fixture {
        let tenant_id = TenantId::new();
        let product = Product::new(tenant_id, ProductId::generate(), "P-1", "Pump")
            .with_base_price(dec!(100))
            .with_purchase_price(dec!(60));

        let default_list =
            PriceList::new(tenant_id, PriceListId::generate(), "Retail", ListType::Sales)
                .as_default();
        let default_entry =
            PriceListEntry::new(tenant_id, default_list.id, product.id, dec!(90));

        let party_list =
            PriceList::new(tenant_id, PriceListId::generate(), "Key accounts", ListType::Sales);
        let party_entry = PriceListEntry::new(tenant_id, party_list.id, product.id, dec!(80));

        Fixture {
            product,
            default_list,
            default_entry,
            party_list,
            party_entry,
        }
    }

    fn today() -> NaiveDate {
        day(2024, 6, 15)
    }

    #[test]
    fn party_list_beats_default_beats_fallback() {
        let f = fixture();
        let party = ListCandidate::new(&f.party_list, Some(&f.party_entry));
        let default = ListCandidate::new(&f.default_list, Some(&f.default_entry));

        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_party_list(party)
            .with_default_list(default);
        let q = resolve(&ctx).unwrap();
        assert_eq!(q.price, dec!(80));
        assert_eq!(q.source.tier(), 1);

        let ctx = PricingContext::new(&f.product, ListType::Sales, today()).with_default_list(default);
        let q = resolve(&ctx).unwrap();
        assert_eq!(q.price, dec!(90));
        assert_eq!(q.source.tier(), 2);

        let q = resolve(&PricingContext::new(&f.product, ListType::Sales, today())).unwrap();
        assert_eq!(q.price, dec!(100));
        assert_eq!(q.source, PriceSource::ProductFallback);
    }

    #[test]
    fn purchase_fallback_uses_purchase_price() {
        let f = fixture();
        let q = resolve(&PricingContext::new(&f.product, ListType::Purchase, today())).unwrap();
        assert_eq!(q.price, dec!(60));
    }

    #[test]
    fn out_of_window_entry_falls_through() {
        let mut f = fixture();
        f.party_entry = f
            .party_entry
            .with_window(Some(day(2024, 7, 1)), None);
        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_party_list(ListCandidate::new(&f.party_list, Some(&f.party_entry)))
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        assert_eq!(resolve(&ctx).unwrap().price, dec!(90));

        let ctx = PricingContext::new(&f.product, ListType::Sales, day(2024, 7, 1))
            .with_party_list(ListCandidate::new(&f.party_list, Some(&f.party_entry)));
        assert_eq!(resolve(&ctx).unwrap().price, dec!(80));
    }

    #[test]
    fn inactive_list_is_skipped() {
        let mut f = fixture();
        f.party_list.is_active = false;
        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_party_list(ListCandidate::new(&f.party_list, Some(&f.party_entry)))
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        assert_eq!(resolve(&ctx).unwrap().source.tier(), 2);
    }

    #[test]
    fn list_of_wrong_type_is_skipped() {
        let f = fixture();
        let ctx = PricingContext::new(&f.product, ListType::Purchase, today())
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        assert_eq!(resolve(&ctx).unwrap().price, dec!(60));
    }

    #[test]
    fn quote_defaults_floor_cap_and_commission() {
        let mut f = fixture();
        f.product.max_discount_percent = Some(pct(dec!(25)));
        f.default_list = f.default_list.with_commission(pct(dec!(3)));
        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        let q = resolve(&ctx).unwrap();
        assert_eq!(q.minimum_price, Decimal::ZERO);
        assert_eq!(q.max_discount_percent, pct(dec!(25)));
        assert_eq!(q.commission_percent, Override::Auto(pct(dec!(3))));
    }

    #[test]
    fn entry_limits_and_commission_override_win() {
        let mut f = fixture();
        f.default_entry = f
            .default_entry
            .with_minimum_price(dec!(85))
            .with_max_discount(pct(dec!(10)))
            .with_commission_override(pct(dec!(7)));
        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        let q = resolve(&ctx).unwrap();
        assert_eq!(q.minimum_price, dec!(85));
        assert_eq!(q.max_discount_percent, pct(dec!(10)));
        assert_eq!(q.commission_percent, Override::Manual(pct(dec!(7))));
    }

    #[test]
    fn fallback_without_base_price_is_validation_error() {
        let mut f = fixture();
        f.product.base_price = None;
        let err = resolve(&PricingContext::new(&f.product, ListType::Sales, today())).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn ineligible_or_archived_product_is_not_found() {
        let mut f = fixture();
        f.product.sellable = false;
        assert!(matches!(
            resolve(&PricingContext::new(&f.product, ListType::Sales, today())),
            Err(DomainError::NotFound(_))
        ));

        let mut f = fixture();
        f.product.status = ProductStatus::Archived;
        assert!(matches!(
            resolve(&PricingContext::new(&f.product, ListType::Purchase, today())),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn non_default_list_is_not_used_as_default() {
        let mut f = fixture();
        f.default_list.is_default = false;
        let ctx = PricingContext::new(&f.product, ListType::Sales, today())
            .with_default_list(ListCandidate::new(&f.default_list, Some(&f.default_entry)));
        assert_eq!(resolve(&ctx).unwrap().price, dec!(100));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: resolution is a pure function of its inputs, on either
            /// side of the entry's validity window.
            #[test]
            fn resolve_is_idempotent(
                base in 1u32..10_000,
                listed in proptest::option::of(1u32..10_000),
                offset in -30i64..30,
            ) {
                let mut f = fixture();
                f.product.base_price = Some(Decimal::from(base));
                if let Some(p) = listed {
                    f.default_entry.price = Decimal::from(p);
                }
                f.default_entry = f.default_entry.clone().with_window(
                    today().checked_sub_days(chrono::Days::new(10)),
                    today().checked_add_days(chrono::Days::new(10)),
                );
                let days = chrono::Days::new(offset.unsigned_abs());
                let on = if offset < 0 {
                    today().checked_sub_days(days)
                } else {
                    today().checked_add_days(days)
                }
                .unwrap();
                let ctx = PricingContext::new(&f.product, ListType::Sales, on)
                    .with_default_list(ListCandidate::new(
                        &f.default_list,
                        listed.map(|_| &f.default_entry),
                    ));

                let before = f.product.clone();
                let a = resolve(&ctx).unwrap();
                let b = resolve(&ctx).unwrap();
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(&f.product, &before);
                let listed = listed.filter(|_| offset.abs() <= 10);
                let expected = listed.map(Decimal::from).unwrap_or(Decimal::from(base));
                prop_assert_eq!(a.price, expected);
            }
        }
    }
}
