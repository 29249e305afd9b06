//! Effective cost and margin.

use rust_decimal::Decimal;

use pricewise_catalog::Product;
use pricewise_core::Override;

use crate::ledger::CostState;

/// Cost to use for margin computations.
///
/// A manual `cost_override` on the product wins. Otherwise the ledger decides:
/// last inbound cost, then the moving average, then the product's purchase
/// reference price. `None` when none of these is known.
pub fn effective_cost(product: &Product, state: &CostState) -> Option<Override<Decimal>> {
    if let Some(cost) = product.cost_override {
        return Some(Override::Manual(cost));
    }

    state
        .last_cost
        .or_else(|| (state.average_cost > Decimal::ZERO).then_some(state.average_cost))
        .or(product.purchase_price)
        .map(Override::Auto)
}

/// Margin percent of `sell_price` over `cost`; `None` for a non-positive sell
/// price or when the ratio does not fit in a `Decimal`.
pub fn margin_percent(sell_price: Decimal, cost: Decimal) -> Option<Decimal> {
    if sell_price <= Decimal::ZERO {
        return None;
    }
    sell_price
        .checked_sub(cost)?
        .checked_div(sell_price)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
