use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewise_catalog::ProductId;
use pricewise_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use pricewise_events::{Command, Event};

use crate::movement::{MovementDirection, MovementId, StockMovement, WarehouseId};

/// Aggregate type tag used for cost-ledger streams in the event store.
pub const AGGREGATE_TYPE: &str = "valuation.cost_ledger";

/// Cost and quantity state of one product, as rebuilt from its movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostState {
    pub product_id: ProductId,
    /// May go negative: outbound movements are not blocked on stock.
    pub on_hand: Decimal,
    /// Moving weighted average of inbound unit costs.
    pub average_cost: Decimal,
    /// Unit cost of the most recent inbound movement.
    pub last_cost: Option<Decimal>,
    pub inbound_movements: u64,
    /// Number of movements applied; equals the stream revision.
    pub movements: u64,
}

impl CostState {
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            on_hand: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            last_cost: None,
            inbound_movements: 0,
            movements: 0,
        }
    }

    pub fn has_inbound(&self) -> bool {
        self.inbound_movements > 0
    }

    /// `on_hand × average_cost` while stock is positive, zero otherwise.
    /// `None` when the product does not fit in a `Decimal`.
    pub fn stock_value(&self) -> Option<Decimal> {
        if self.on_hand > Decimal::ZERO {
            self.on_hand.checked_mul(self.average_cost)
        } else {
            Some(Decimal::ZERO)
        }
    }

    /// State after one signed movement, or `None` when on-hand, the weighted
    /// average or the resulting stock value would overflow.
    ///
    /// Does not touch `movements`; the ledger counts applied events itself.
    pub fn advanced(&self, movement: &StockMovement) -> Option<CostState> {
        let quantity = movement.quantity;
        let mut next = self.clone();
        next.on_hand = self.on_hand.checked_add(quantity)?;

        if movement.direction() == MovementDirection::Inbound {
            let cost = movement.unit_cost.unwrap_or(self.average_cost);
            next.average_cost = if self.on_hand <= Decimal::ZERO {
                cost
            } else {
                self.average_cost
                    .checked_mul(self.on_hand)?
                    .checked_add(cost.checked_mul(quantity)?)?
                    .checked_div(next.on_hand)?
            };
            next.last_cost = Some(cost);
            next.inbound_movements += 1;
        }

        next.stock_value()?;
        Some(next)
    }
}

/// Aggregate root: the cost ledger of one product.
///
/// The recurrence is order-dependent, so movements must be applied in stream
/// order. The event store's optimistic check linearizes concurrent posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostLedger {
    tenant_id: Option<TenantId>,
    state: CostState,
    posted: HashSet<MovementId>,
}

impl CostLedger {
    /// Empty ledger for rehydration (no movements yet).
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            tenant_id: None,
            state: CostState::empty(product_id),
            posted: HashSet::new(),
        }
    }

    /// Ledger seeded from a snapshot owned by `tenant_id`. Duplicate
    /// detection only covers movements applied after the snapshot.
    pub fn from_state(tenant_id: TenantId, state: CostState) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            state,
            posted: HashSet::new(),
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.state.product_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn state(&self) -> &CostState {
        &self.state
    }

    pub fn into_state(self) -> CostState {
        self.state
    }
}

impl AggregateRoot for CostLedger {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.state.product_id
    }

    fn version(&self) -> u64 {
        self.state.movements
    }
}

/// Command: PostMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMovement {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub movement_id: MovementId,
    pub warehouse_id: Option<WarehouseId>,
    /// Signed quantity: `+` inbound, `-` outbound.
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

impl PostMovement {
    pub fn inbound(
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            product_id,
            movement_id: MovementId::generate(),
            warehouse_id: None,
            quantity,
            unit_cost: Some(unit_cost),
            occurred_at,
        }
    }

    pub fn outbound(
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            product_id,
            movement_id: MovementId::generate(),
            warehouse_id: None,
            quantity: -quantity.abs(),
            unit_cost: None,
            occurred_at,
        }
    }

    pub fn in_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.warehouse_id = Some(warehouse_id);
        self
    }
}

impl Command for PostMovement {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn target_aggregate_id(&self) -> AggregateId {
        self.product_id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationCommand {
    PostMovement(PostMovement),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationEvent {
    MovementPosted(StockMovement),
}

impl Event for ValuationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ValuationEvent::MovementPosted(_) => "valuation.movement.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ValuationEvent::MovementPosted(m) => m.occurred_at,
        }
    }
}

impl Aggregate for CostLedger {
    type Command = ValuationCommand;
    type Event = ValuationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ValuationEvent::MovementPosted(m) => {
                self.tenant_id = Some(m.tenant_id);
                // `handle` only emits movements whose next state is representable.
                if let Some(next) = self.state.advanced(m) {
                    self.state = next;
                }
                self.posted.insert(m.movement_id);
            }
        }

        self.state.movements += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ValuationCommand::PostMovement(cmd) => self.handle_post(cmd),
        }
    }
}

impl CostLedger {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        match self.tenant_id {
            Some(owner) if owner != tenant_id => Err(DomainError::invariant("tenant mismatch")),
            _ => Ok(()),
        }
    }

    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.state.product_id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_post(&self, cmd: &PostMovement) -> Result<Vec<ValuationEvent>, DomainError> {
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_product_id(cmd.product_id)?;

        if cmd.quantity.is_zero() {
            return Err(DomainError::validation("quantity cannot be zero"));
        }

        match (cmd.quantity > Decimal::ZERO, cmd.unit_cost) {
            (true, None) => {
                return Err(DomainError::validation(
                    "inbound movement requires unit_cost",
                ));
            }
            (true, Some(cost)) if cost < Decimal::ZERO => {
                return Err(DomainError::validation("unit_cost cannot be negative"));
            }
            (false, Some(_)) => {
                return Err(DomainError::validation(
                    "outbound movement must not carry unit_cost",
                ));
            }
            _ => {}
        }

        if self.posted.contains(&cmd.movement_id) {
            return Err(DomainError::conflict(format!(
                "movement {} already posted",
                cmd.movement_id
            )));
        }

        let movement = StockMovement {
            movement_id: cmd.movement_id,
            tenant_id: cmd.tenant_id,
            product_id: cmd.product_id,
            warehouse_id: cmd.warehouse_id,
            quantity: cmd.quantity,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        };
        if self.state.advanced(&movement).is_none() {
            return Err(DomainError::validation(
                "movement would overflow the product's stock value",
            ));
        }

        Ok(vec![ValuationEvent::MovementPosted(movement)])
    }
}
