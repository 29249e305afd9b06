use rust_decimal::Decimal;

use pricewise_catalog::PackagingProfile;
use pricewise_core::{DomainError, DomainResult, Percent, PolicyViolation};
use pricewise_pricing::{PricingContext, resolve};
use pricewise_valuation::{CostState, effective_cost, margin_percent};

use crate::line::{LineRequest, LineWarning, OrderLine, OrderType};
use crate::policy::{StockShortfallPolicy, ValidationPolicy};

/// Current state a line is validated against.
#[derive(Debug, Clone, Copy)]
pub struct LineInputs<'a> {
    pub pricing: PricingContext<'a>,
    pub cost_state: &'a CostState,
    pub packaging: Option<&'a PackagingProfile>,
}

/// Accept or reject one order line and compute its amounts.
///
/// Checks run in a fixed order and the first failure wins: input shape,
/// price resolution, discount cap, price floor, MOQ (purchase), stock
/// (sales). Amounts that do not fit in a `Decimal` reject the line as a
/// validation error.
pub fn validate_line(
    order_type: OrderType,
    request: &LineRequest,
    inputs: &LineInputs<'_>,
    policy: &ValidationPolicy,
) -> DomainResult<OrderLine> {
    let product = inputs.pricing.product;

    if request.product_id != product.id || inputs.cost_state.product_id != product.id {
        return Err(DomainError::invariant("line inputs belong to another product"));
    }
    if inputs.pricing.list_type != order_type.list_type() {
        return Err(DomainError::invariant("price context does not match order type"));
    }
    if request.quantity <= Decimal::ZERO {
        return Err(DomainError::validation("quantity must be positive"));
    }
    let discount = Percent::new(request.discount_percent)?;

    let quote = resolve(&inputs.pricing)?;

    if discount > quote.max_discount_percent {
        return Err(PolicyViolation::DiscountExceedsCap {
            requested: discount.value(),
            cap: quote.max_discount_percent.value(),
        }
        .into());
    }

    let effective_unit_price = quote
        .discounted_price(discount)
        .ok_or_else(amount_overflow)?;
    if effective_unit_price < quote.minimum_price {
        return Err(PolicyViolation::BelowMinimumPrice {
            effective_price: effective_unit_price,
            minimum_price: quote.minimum_price,
        }
        .into());
    }

    let mut warnings = Vec::new();

    match order_type {
        OrderType::Purchase => {
            if let Some(minimum) = product.minimum_order_quantity {
                if policy.enforce_moq && request.quantity < minimum {
                    return Err(PolicyViolation::BelowMoq {
                        requested: request.quantity,
                        minimum,
                    }
                    .into());
                }
            }
        }
        OrderType::Sales => {
            let on_hand = inputs.cost_state.on_hand;
            if request.quantity > on_hand {
                match policy.stock_shortfall {
                    StockShortfallPolicy::Reject => {
                        return Err(PolicyViolation::InsufficientStock {
                            requested: request.quantity,
                            on_hand,
                        }
                        .into());
                    }
                    StockShortfallPolicy::Warn => warnings.push(LineWarning::InsufficientStock {
                        requested: request.quantity,
                        on_hand,
                    }),
                }
            }
        }
    }

    if policy.packaging_alignment_warnings {
        if let Some(profile) = inputs.packaging {
            let derived = profile.expand();
            if !derived.alignment(request.quantity).whole_cartons {
                warnings.push(LineWarning::PackagingMisaligned {
                    pieces_per_carton: derived.pieces_per_carton,
                    pieces_per_pallet: derived.pieces_per_pallet,
                });
            }
        }
    }

    let gross = request
        .quantity
        .checked_mul(quote.price)
        .ok_or_else(amount_overflow)?;
    let discount_amount = discount.of(gross).ok_or_else(amount_overflow)?;
    let subtotal = gross
        .checked_sub(discount_amount)
        .ok_or_else(amount_overflow)?;

    let cost = effective_cost(product, inputs.cost_state);
    let margin = cost.and_then(|c| margin_percent(effective_unit_price, *c.value()));

    Ok(OrderLine {
        product_id: product.id,
        order_type,
        quantity: request.quantity,
        unit_price: quote.price,
        discount_percent: discount,
        effective_unit_price,
        gross,
        discount_amount,
        subtotal,
        source: quote.source,
        commission_percent: quote.commission_percent,
        effective_cost: cost,
        margin_percent: margin,
        warnings,
    })
}

fn amount_overflow() -> DomainError {
    DomainError::validation("line amount exceeds the representable range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pricewise_catalog::{
        ListType, PriceList, PriceListEntry, PriceListId, Product, ProductId, ProductStatus,
    };
    use pricewise_core::{Override, TenantId};
    use pricewise_pricing::ListCandidate;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn pct(v: Decimal) -> Percent {
        Percent::new(v).unwrap()
    }

    struct Catalog {
        product: Product,
        list: PriceList,
        entry: PriceListEntry,
        stock: CostState,
    }

    fn catalog(list_type: ListType) -> Catalog {
        let tenant_id = TenantId::new();
        let product = Product::new(tenant_id, ProductId::generate(), "C-1", "Cable")
            .with_base_price(dec!(60))
            .with_purchase_price(dec!(30));
        let list = PriceList::new(tenant_id, PriceListId::generate(), "Default", list_type)
            .as_default();
        let entry = PriceListEntry::new(tenant_id, list.id, product.id, dec!(50));
        let mut stock = CostState::empty(product.id);
        stock.on_hand = dec!(100);
        stock.average_cost = dec!(40);
        stock.last_cost = Some(dec!(40));
        stock.inbound_movements = 1;
        Catalog {
            product,
            list,
            entry,
            stock,
        }
    }

    fn check(
        c: &Catalog,
        order_type: OrderType,
        request: &LineRequest,
        policy: &ValidationPolicy,
    ) -> DomainResult<OrderLine> {
        let pricing = PricingContext::new(&c.product, order_type.list_type(), today())
            .with_default_list(ListCandidate::new(&c.list, Some(&c.entry)));
        let inputs = LineInputs {
            pricing,
            cost_state: &c.stock,
            packaging: None,
        };
        validate_line(order_type, request, &inputs, policy)
    }

    #[test]
    fn discount_above_cap_is_rejected() {
        let mut c = catalog(ListType::Sales);
        c.entry = c.entry.clone().with_max_discount(pct(dec!(10)));
        let req = LineRequest::new(c.product.id, dec!(1)).with_discount(dec!(15));

        let err = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap_err();
        assert_eq!(
            err,
            DomainError::Policy(PolicyViolation::DiscountExceedsCap {
                requested: dec!(15),
                cap: dec!(10),
            })
        );
    }

    #[test]
    fn discount_below_floor_is_rejected() {
        let mut c = catalog(ListType::Sales);
        c.entry = c.entry.clone().with_minimum_price(dec!(45));
        let req = LineRequest::new(c.product.id, dec!(1)).with_discount(dec!(15));

        let err = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap_err();
        match err {
            DomainError::Policy(PolicyViolation::BelowMinimumPrice {
                effective_price,
                minimum_price,
            }) => {
                assert_eq!(effective_price, dec!(42.5));
                assert_eq!(minimum_price, dec!(45));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn purchase_below_moq_is_rejected_unless_disabled() {
        let mut c = catalog(ListType::Purchase);
        c.product = c.product.clone().with_minimum_order_quantity(dec!(5));
        let req = LineRequest::new(c.product.id, dec!(3));

        let err = check(&c, OrderType::Purchase, &req, &ValidationPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Policy(PolicyViolation::BelowMoq { minimum, .. }) if minimum == dec!(5)
        ));

        let lenient = ValidationPolicy {
            enforce_moq: false,
            ..ValidationPolicy::default()
        };
        assert!(check(&c, OrderType::Purchase, &req, &lenient).is_ok());
    }

    #[test]
    fn sales_ignore_moq() {
        let mut c = catalog(ListType::Sales);
        c.product = c.product.clone().with_minimum_order_quantity(dec!(5));
        let req = LineRequest::new(c.product.id, dec!(3));
        assert!(check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn stock_shortfall_warns_by_default_and_rejects_when_configured() {
        let c = catalog(ListType::Sales);
        let req = LineRequest::new(c.product.id, dec!(120));

        let line = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap();
        assert_eq!(
            line.warnings,
            vec![LineWarning::InsufficientStock {
                requested: dec!(120),
                on_hand: dec!(100),
            }]
        );

        let strict = ValidationPolicy {
            stock_shortfall: StockShortfallPolicy::Reject,
            ..ValidationPolicy::default()
        };
        let err = check(&c, OrderType::Sales, &req, &strict).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Policy(PolicyViolation::InsufficientStock { .. })
        ));
    }

    #[test]
    fn computes_amounts_source_and_margin() {
        let c = catalog(ListType::Sales);
        let req = LineRequest::new(c.product.id, dec!(4)).with_discount(dec!(10));
        let line = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap();

        assert_eq!(line.unit_price, dec!(50));
        assert_eq!(line.effective_unit_price, dec!(45));
        assert_eq!(line.gross, dec!(200));
        assert_eq!(line.discount_amount, dec!(20));
        assert_eq!(line.subtotal, dec!(180));
        assert_eq!(line.price_tier(), 2);
        assert_eq!(line.effective_cost, Some(Override::Auto(dec!(40))));
        let margin = line.margin_percent.unwrap();
        assert!(margin > dec!(11.11) && margin < dec!(11.12));
        assert!(!line.has_warnings());
    }

    #[test]
    fn misaligned_packaging_warns() {
        let c = catalog(ListType::Sales);
        let profile = PackagingProfile {
            pieces_per_pack: Some(10),
            packs_per_carton: Some(2),
            ..PackagingProfile::for_product(c.product.id)
        };
        let pricing = PricingContext::new(&c.product, ListType::Sales, today());
        let inputs = LineInputs {
            pricing,
            cost_state: &c.stock,
            packaging: Some(&profile),
        };
        let policy = ValidationPolicy::default();

        let req = LineRequest::new(c.product.id, dec!(30));
        let line = validate_line(OrderType::Sales, &req, &inputs, &policy).unwrap();
        assert_eq!(
            line.warnings,
            vec![LineWarning::PackagingMisaligned {
                pieces_per_carton: 20,
                pieces_per_pallet: None,
            }]
        );

        let req = LineRequest::new(c.product.id, dec!(40));
        let line = validate_line(OrderType::Sales, &req, &inputs, &policy).unwrap();
        assert!(line.warnings.is_empty());
    }

    #[test]
    fn rejects_malformed_requests() {
        let c = catalog(ListType::Sales);
        let policy = ValidationPolicy::default();

        let zero = LineRequest::new(c.product.id, dec!(0));
        assert!(matches!(
            check(&c, OrderType::Sales, &zero, &policy),
            Err(DomainError::Validation(_))
        ));

        let too_much = LineRequest::new(c.product.id, dec!(1)).with_discount(dec!(101));
        assert!(matches!(
            check(&c, OrderType::Sales, &too_much, &policy),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn archived_product_is_not_found() {
        let mut c = catalog(ListType::Sales);
        c.product.status = ProductStatus::Archived;
        let req = LineRequest::new(c.product.id, dec!(1));
        assert!(matches!(
            check(&c, OrderType::Sales, &req, &ValidationPolicy::default()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn line_amount_overflow_is_a_validation_error() {
        let mut c = catalog(ListType::Purchase);
        c.entry.price = dec!(10000000000);
        let req = LineRequest::new(c.product.id, dec!(100000000000000000000));

        let err = check(&c, OrderType::Purchase, &req, &ValidationPolicy::default()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("representable")));
    }

    #[test]
    fn margin_is_absent_when_it_does_not_fit() {
        let mut c = catalog(ListType::Sales);
        c.entry.price = dec!(0.0000000001);
        c.stock.last_cost = Some(Decimal::MAX);
        let req = LineRequest::new(c.product.id, dec!(1));

        let line = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap();
        assert_eq!(line.margin_percent, None);
        assert_eq!(line.effective_cost, Some(Override::Auto(Decimal::MAX)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: subtotal is gross minus discount and never exceeds gross.
            #[test]
            fn subtotal_is_gross_minus_discount(
                qty in 1u32..1_000,
                cents in 1u32..100_000,
                discount in 0u32..=100,
            ) {
                let mut c = catalog(ListType::Sales);
                c.entry.price = Decimal::new(i64::from(cents), 2);
                c.stock.on_hand = Decimal::from(qty);
                let req = LineRequest::new(c.product.id, Decimal::from(qty))
                    .with_discount(Decimal::from(discount));

                let line = check(&c, OrderType::Sales, &req, &ValidationPolicy::default()).unwrap();
                prop_assert_eq!(line.subtotal, line.gross - line.discount_amount);
                prop_assert!(line.subtotal <= line.gross);
                prop_assert!(line.subtotal >= Decimal::ZERO);
                prop_assert_eq!(line.gross, Decimal::from(qty) * c.entry.price);
            }
        }
    }
}
