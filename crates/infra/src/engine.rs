//! The pricing and valuation engine as a service boundary.
//!
//! Loads current state from the stores, hands it to the pure domain crates and
//! maps the outcome to [`EngineError`]. Every call takes the tenant explicitly.

use rust_decimal::Decimal;

use pricewise_catalog::{
    DerivedQuantities, ListType, PackagingProfile, PartyId, PriceList, PriceListEntry, Product,
    ProductId,
};
use pricewise_core::{AggregateId, DomainError, DomainResult, Override, TenantId};
use pricewise_events::Command;
use pricewise_orders::{LineInputs, LineRequest, OrderDraft, OrderLine, OrderType, OrderValidation};
use pricewise_pricing::{ListCandidate, PriceQuote, PricingContext};
use pricewise_valuation::{AGGREGATE_TYPE, CostLedger, CostState, PostMovement, ValuationCommand};

use crate::catalog_store::CatalogStore;
use crate::clock::Clock;
use crate::command_dispatcher::CommandDispatcher;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::event_store::EventStore;
use crate::retry::retry_with_backoff;

fn ledger(_: TenantId, id: AggregateId) -> CostLedger {
    CostLedger::empty(ProductId::new(id))
}

/// Catalog records one resolution reads, owned so the borrowed
/// [`PricingContext`] can be built over them.
struct PricingInputs {
    product: Product,
    party_list: Option<(PriceList, Option<PriceListEntry>)>,
    default_list: Option<(PriceList, Option<PriceListEntry>)>,
}

impl PricingInputs {
    fn context(&self, list_type: ListType, on: chrono::NaiveDate) -> PricingContext<'_> {
        let mut ctx = PricingContext::new(&self.product, list_type, on);
        if let Some((list, entry)) = &self.party_list {
            ctx = ctx.with_party_list(ListCandidate::new(list, entry.as_ref()));
        }
        if let Some((list, entry)) = &self.default_list {
            ctx = ctx.with_default_list(ListCandidate::new(list, entry.as_ref()));
        }
        ctx
    }
}

pub struct PricingEngine<C, S, K> {
    catalog: C,
    dispatcher: CommandDispatcher<S>,
    clock: K,
    config: EngineConfig,
}

impl<C, S, K> PricingEngine<C, S, K>
where
    C: CatalogStore,
    S: EventStore,
    K: Clock,
{
    pub fn new(catalog: C, events: S, clock: K, config: EngineConfig) -> Self {
        Self {
            catalog,
            dispatcher: CommandDispatcher::new(events),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn event_store(&self) -> &S {
        self.dispatcher.store()
    }

    /// Applicable price for a product: party list, then default list, then the
    /// product's own fallback price.
    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %tenant_id,
            product_id = %product_id,
            list_type = %list_type,
            party_id = ?party_id
        )
    )]
    pub async fn resolve(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        list_type: ListType,
        party_id: Option<PartyId>,
    ) -> EngineResult<PriceQuote> {
        let inputs = self
            .load_pricing(tenant_id, product_id, list_type, party_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {product_id}")))?;

        let quote = pricewise_pricing::resolve(&inputs.context(list_type, self.clock.today()))?;
        tracing::debug!(price = %quote.price, tier = quote.source.tier(), "price resolved");
        Ok(quote)
    }

    /// Append one movement to the product's cost ledger.
    ///
    /// A concurrent post on the same product surfaces as
    /// [`EngineError::Concurrency`] with nothing persisted.
    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %tenant_id,
            product_id = %movement.product_id,
            movement_id = %movement.movement_id,
            quantity = %movement.quantity
        )
    )]
    pub async fn post_movement(
        &self,
        tenant_id: TenantId,
        movement: PostMovement,
    ) -> EngineResult<CostState> {
        if movement.tenant_id() != tenant_id {
            return Err(EngineError::TenantIsolation(
                "movement tenant_id does not match the calling tenant".to_string(),
            ));
        }
        let product_id = movement.product_id;
        let stream_id = movement.target_aggregate_id();
        if self.catalog.product(tenant_id, product_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("product {product_id}")));
        }

        let outcome = self
            .dispatcher
            .dispatch(
                tenant_id,
                stream_id,
                AGGREGATE_TYPE,
                ValuationCommand::PostMovement(movement),
                ledger,
            )
            .await;

        match outcome {
            Ok(dispatched) => {
                let state = dispatched.aggregate.into_state();
                tracing::info!(
                    on_hand = %state.on_hand,
                    average_cost = %state.average_cost,
                    revision = state.movements,
                    "movement posted"
                );
                Ok(state)
            }
            Err(err @ EngineError::Concurrency(_)) => {
                tracing::warn!(error = %err, "movement lost a race on the ledger stream");
                Err(err)
            }
            Err(err) => {
                tracing::debug!(error = %err, code = err.code(), "movement rejected");
                Err(err)
            }
        }
    }

    /// [`PricingEngine::post_movement`] retried on conflicts and transient
    /// failures. Each attempt re-reads the stream, so a retried movement lands
    /// on top of whatever won the race.
    pub async fn post_movement_with_retry(
        &self,
        tenant_id: TenantId,
        movement: PostMovement,
    ) -> EngineResult<CostState> {
        retry_with_backoff(&self.config.retry, || {
            self.post_movement(tenant_id, movement.clone())
        })
        .await
    }

    pub async fn cost_state(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<CostState> {
        let ledger = self.dispatcher.load(tenant_id, product_id.0, ledger).await?;
        Ok(ledger.into_state())
    }

    /// Manual cost override, else the best cost the ledger knows.
    pub async fn effective_cost(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<Override<Decimal>>> {
        let product = self.product(tenant_id, product_id).await?;
        let state = self.cost_state(tenant_id, product_id).await?;
        Ok(pricewise_valuation::effective_cost(&product, &state))
    }

    /// Margin of `sell_price` over the effective cost; `None` when either is
    /// undefined.
    pub async fn margin(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        sell_price: Decimal,
    ) -> EngineResult<Option<Decimal>> {
        let cost = self.effective_cost(tenant_id, product_id).await?;
        Ok(cost.and_then(|c| pricewise_valuation::margin_percent(sell_price, c.into_value())))
    }

    /// Validate and price one order line against current state.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %tenant_id, product_id = %request.product_id, order_type = ?order_type)
    )]
    pub async fn validate_line(
        &self,
        tenant_id: TenantId,
        party_id: Option<PartyId>,
        order_type: OrderType,
        request: LineRequest,
    ) -> EngineResult<OrderLine> {
        let line = self
            .check_line(tenant_id, party_id, order_type, &request)
            .await?
            .inspect_err(|err| tracing::debug!(error = %err, code = err.code(), "line rejected"))?;
        if line.has_warnings() {
            tracing::debug!(warnings = line.warnings.len(), "line accepted with warnings");
        }
        Ok(line)
    }

    /// Validate every line of an order independently, in submission order.
    ///
    /// Business rejections are reported per line; store failures abort the
    /// whole validation.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %tenant_id, order_type = ?draft.order_type, lines = draft.lines.len())
    )]
    pub async fn validate_order(
        &self,
        tenant_id: TenantId,
        draft: &OrderDraft,
    ) -> EngineResult<OrderValidation> {
        let mut results = Vec::with_capacity(draft.lines.len());
        for request in &draft.lines {
            let outcome = self
                .check_line(tenant_id, draft.party_id, draft.order_type, request)
                .await?;
            if let Err(err) = &outcome {
                tracing::debug!(
                    product_id = %request.product_id,
                    code = err.code(),
                    "order line rejected"
                );
            }
            results.push((request.product_id, outcome));
        }

        let validation = OrderValidation::assemble(draft.order_type, results);
        tracing::info!(
            acceptable = validation.is_acceptable(),
            total = %validation.total,
            "order validated"
        );
        Ok(validation)
    }

    /// Carton and pallet quantities of a packaging profile.
    pub fn expand(&self, profile: &PackagingProfile) -> DerivedQuantities {
        profile.expand()
    }

    async fn product(&self, tenant_id: TenantId, product_id: ProductId) -> EngineResult<Product> {
        self.catalog
            .product(tenant_id, product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("product {product_id}")))
    }

    /// Outer error: store failure. Inner error: the line itself is rejected.
    async fn check_line(
        &self,
        tenant_id: TenantId,
        party_id: Option<PartyId>,
        order_type: OrderType,
        request: &LineRequest,
    ) -> EngineResult<DomainResult<OrderLine>> {
        let list_type = order_type.list_type();
        let Some(inputs) = self
            .load_pricing(tenant_id, request.product_id, list_type, party_id)
            .await?
        else {
            return Ok(Err(DomainError::not_found(format!(
                "product {}",
                request.product_id
            ))));
        };

        let cost_state = self.cost_state(tenant_id, request.product_id).await?;
        let packaging = self.catalog.packaging(tenant_id, request.product_id).await?;

        let line_inputs = LineInputs {
            pricing: inputs.context(list_type, self.clock.today()),
            cost_state: &cost_state,
            packaging: packaging.as_ref(),
        };
        Ok(pricewise_orders::validate_line(
            order_type,
            request,
            &line_inputs,
            &self.config.validation_policy(),
        ))
    }

    /// `None` when the product does not exist for this tenant.
    async fn load_pricing(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        list_type: ListType,
        party_id: Option<PartyId>,
    ) -> EngineResult<Option<PricingInputs>> {
        let Some(product) = self.catalog.product(tenant_id, product_id).await? else {
            return Ok(None);
        };

        let party_list = match (party_id, list_type) {
            (Some(party_id), ListType::Sales) => {
                match self.catalog.party_price_list(tenant_id, party_id).await? {
                    Some(list_id) => match self.catalog.price_list(tenant_id, list_id).await? {
                        Some(list) => Some(self.with_entry(tenant_id, list, product_id).await?),
                        None => None,
                    },
                    None => None,
                }
            }
            _ => None,
        };

        let default_list = match self.catalog.default_price_list(tenant_id, list_type).await? {
            Some(list) => Some(self.with_entry(tenant_id, list, product_id).await?),
            None => None,
        };

        Ok(Some(PricingInputs {
            product,
            party_list,
            default_list,
        }))
    }

    async fn with_entry(
        &self,
        tenant_id: TenantId,
        list: PriceList,
        product_id: ProductId,
    ) -> EngineResult<(PriceList, Option<PriceListEntry>)> {
        let entry = self.catalog.entry(tenant_id, list.id, product_id).await?;
        Ok((list, entry))
    }
}
