//! Inventory valuation read model.
//!
//! Per product: on-hand, moving average, last cost and stock value
//! (`on_hand × average_cost`, zero when stock is not positive). Folded from
//! `valuation.cost_ledger` envelopes with the same recurrence the ledger uses,
//! so a rebuilt projection always agrees with a rehydrated ledger.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use pricewise_catalog::ProductId;
use pricewise_core::{Aggregate, AggregateId, TenantId};
use pricewise_events::{EventEnvelope, TenantScoped};
use pricewise_valuation::{AGGREGATE_TYPE, CostLedger, CostState, ValuationEvent};

use crate::error::EngineError;
use crate::read_model::TenantStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub product_id: ProductId,
    pub on_hand: Decimal,
    pub average_cost: Decimal,
    pub last_cost: Option<Decimal>,
    pub stock_value: Decimal,
    pub inbound_movements: u64,
    /// Last applied sequence number of the product's ledger stream.
    pub version: u64,
}

impl InventoryValuation {
    fn from_state(state: &CostState) -> Result<Self, InventoryValuationError> {
        let stock_value = state.stock_value().ok_or_else(|| {
            InventoryValuationError::Overflow(format!("stock value of product {}", state.product_id))
        })?;
        Ok(Self {
            product_id: state.product_id,
            on_hand: state.on_hand,
            average_cost: state.average_cost,
            last_cost: state.last_cost,
            stock_value,
            inbound_movements: state.inbound_movements,
            version: state.movements,
        })
    }

    fn to_state(&self) -> CostState {
        CostState {
            product_id: self.product_id,
            on_hand: self.on_hand,
            average_cost: self.average_cost,
            last_cost: self.last_cost,
            inbound_movements: self.inbound_movements,
            movements: self.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryValuationSummary {
    pub products: usize,
    /// Products with stock at or below zero.
    pub out_of_stock: usize,
    pub total_value: Decimal,
}

#[derive(Debug, Error)]
pub enum InventoryValuationError {
    #[error("failed to deserialize ledger event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("{0} exceeds the representable range")]
    Overflow(String),

    #[error(transparent)]
    Store(#[from] EngineError),
}

fn poisoned() -> InventoryValuationError {
    InventoryValuationError::Store(EngineError::Persistence(
        "projection cursor lock poisoned".to_string(),
    ))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

pub struct InventoryValuationProjection<S>
where
    S: TenantStore<ProductId, InventoryValuation>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> InventoryValuationProjection<S>
where
    S: TenantStore<ProductId, InventoryValuation>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    fn cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<u64, InventoryValuationError> {
        let cursors = self.cursors.read().map_err(|_| poisoned())?;
        Ok(cursors
            .get(&CursorKey { tenant_id, aggregate_id })
            .copied()
            .unwrap_or(0))
    }

    fn set_cursor(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        seq: u64,
    ) -> Result<(), InventoryValuationError> {
        let mut cursors = self.cursors.write().map_err(|_| poisoned())?;
        cursors.insert(CursorKey { tenant_id, aggregate_id }, seq);
        Ok(())
    }

    fn clear_cursors(&self, tenant_id: TenantId) -> Result<(), InventoryValuationError> {
        let mut cursors = self.cursors.write().map_err(|_| poisoned())?;
        cursors.retain(|k, _| k.tenant_id != tenant_id);
        Ok(())
    }

    pub fn get(
        &self,
        tenant_id: TenantId,
        product_id: &ProductId,
    ) -> Result<Option<InventoryValuation>, InventoryValuationError> {
        Ok(self.store.get(tenant_id, product_id)?)
    }

    pub fn list(&self, tenant_id: TenantId) -> Result<Vec<InventoryValuation>, InventoryValuationError> {
        Ok(self.store.list(tenant_id)?)
    }

    pub fn summary(
        &self,
        tenant_id: TenantId,
    ) -> Result<InventoryValuationSummary, InventoryValuationError> {
        let rows = self.store.list(tenant_id)?;
        let total_value = rows
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.stock_value))
            .ok_or_else(|| InventoryValuationError::Overflow("total stock value".to_string()))?;
        Ok(InventoryValuationSummary {
            products: rows.len(),
            out_of_stock: rows.iter().filter(|r| r.on_hand <= Decimal::ZERO).count(),
            total_value,
        })
    }

    /// Apply one envelope. Replays at or below the cursor are ignored; gaps
    /// are errors.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), InventoryValuationError> {
        if envelope.aggregate_type() != AGGREGATE_TYPE {
            return Ok(());
        }

        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        let last = self.cursor(tenant_id, aggregate_id)?;

        if seq == 0 {
            return Err(InventoryValuationError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(InventoryValuationError::NonMonotonicSequence { last, found: seq });
        }

        let event: ValuationEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| InventoryValuationError::Deserialize(e.to_string()))?;

        let ValuationEvent::MovementPosted(movement) = &event;
        if !movement.belongs_to(tenant_id) {
            return Err(InventoryValuationError::TenantIsolation(
                "event tenant_id does not match envelope tenant_id".to_string(),
            ));
        }
        if movement.product_id.0 != aggregate_id {
            return Err(InventoryValuationError::TenantIsolation(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        let product_id = movement.product_id;
        let state = self
            .store
            .get(tenant_id, &product_id)?
            .map(|row| row.to_state())
            .unwrap_or_else(|| CostState::empty(product_id));

        let mut ledger = CostLedger::from_state(tenant_id, state);
        ledger.apply(&event);
        let row = InventoryValuation::from_state(ledger.state())?;

        // Cursor moves before the row; a failed upsert rolls it back.
        self.set_cursor(tenant_id, aggregate_id, seq)?;
        if let Err(err) = self.store.upsert(tenant_id, product_id, row) {
            self.set_cursor(tenant_id, aggregate_id, last)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Drop every touched tenant's rows and replay all envelopes in stream order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), InventoryValuationError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        let mut tenants: Vec<TenantId> = envs.iter().map(|e| e.tenant_id()).collect();
        tenants.sort_by_key(|t| *t.as_uuid());
        tenants.dedup();
        for t in tenants {
            self.store.clear_tenant(t)?;
            self.clear_cursors(t)?;
        }

        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid(),
                *e.aggregate_id().as_uuid(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use pricewise_valuation::{MovementId, StockMovement};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::read_model::InMemoryTenantStore;

    type Store = Arc<InMemoryTenantStore<ProductId, InventoryValuation>>;

    fn projection() -> InventoryValuationProjection<Store> {
        InventoryValuationProjection::new(Arc::new(InMemoryTenantStore::new()))
    }

    fn envelope(
        tenant_id: TenantId,
        product_id: ProductId,
        seq: u64,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
    ) -> EventEnvelope<JsonValue> {
        let event = ValuationEvent::MovementPosted(StockMovement {
            movement_id: MovementId::generate(),
            tenant_id,
            product_id,
            warehouse_id: None,
            quantity,
            unit_cost,
            occurred_at: Utc::now(),
        });
        EventEnvelope::new(
            Uuid::now_v7(),
            tenant_id,
            product_id.0,
            AGGREGATE_TYPE,
            seq,
            "valuation.movement.posted",
            Utc::now(),
            serde_json::to_value(&event).unwrap(),
        )
    }

    #[test]
    fn folds_movements_into_value() {
        let proj = projection();
        let tenant_id = TenantId::new();
        let product_id = ProductId::generate();

        proj.apply_envelope(&envelope(tenant_id, product_id, 1, dec!(10), Some(dec!(5))))
            .unwrap();
        proj.apply_envelope(&envelope(tenant_id, product_id, 2, dec!(5), Some(dec!(8))))
            .unwrap();
        proj.apply_envelope(&envelope(tenant_id, product_id, 3, dec!(-3), None))
            .unwrap();

        let row = proj.get(tenant_id, &product_id).unwrap().unwrap();
        assert_eq!(row.on_hand, dec!(12));
        assert_eq!(row.average_cost, dec!(6));
        assert_eq!(row.last_cost, Some(dec!(8)));
        assert_eq!(row.stock_value, dec!(72));
        assert_eq!(row.version, 3);
    }

    #[test]
    fn replays_are_ignored_and_gaps_rejected() {
        let proj = projection();
        let tenant_id = TenantId::new();
        let product_id = ProductId::generate();

        let first = envelope(tenant_id, product_id, 1, dec!(4), Some(dec!(2)));
        proj.apply_envelope(&first).unwrap();
        proj.apply_envelope(&first).unwrap();
        assert_eq!(proj.get(tenant_id, &product_id).unwrap().unwrap().on_hand, dec!(4));

        let gap = envelope(tenant_id, product_id, 3, dec!(1), Some(dec!(2)));
        assert!(matches!(
            proj.apply_envelope(&gap),
            Err(InventoryValuationError::NonMonotonicSequence { last: 1, found: 3 })
        ));
    }

    #[test]
    fn negative_stock_has_zero_value() {
        let proj = projection();
        let tenant_id = TenantId::new();
        let product_id = ProductId::generate();

        proj.apply_envelope(&envelope(tenant_id, product_id, 1, dec!(2), Some(dec!(3))))
            .unwrap();
        proj.apply_envelope(&envelope(tenant_id, product_id, 2, dec!(-5), None))
            .unwrap();

        let row = proj.get(tenant_id, &product_id).unwrap().unwrap();
        assert_eq!(row.on_hand, dec!(-3));
        assert_eq!(row.stock_value, Decimal::ZERO);

        let summary = proj.summary(tenant_id).unwrap();
        assert_eq!(summary.products, 1);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.total_value, Decimal::ZERO);
    }

    #[test]
    fn rebuild_matches_incremental_and_isolates_tenants() {
        let proj = projection();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();

        let envs = vec![
            envelope(tenant_a, p1, 2, dec!(5), Some(dec!(8))),
            envelope(tenant_b, p2, 1, dec!(1), Some(dec!(100))),
            envelope(tenant_a, p1, 1, dec!(10), Some(dec!(5))),
            envelope(tenant_a, p2, 1, dec!(2), Some(dec!(1))),
        ];
        proj.rebuild_from_scratch(envs).unwrap();

        let row = proj.get(tenant_a, &p1).unwrap().unwrap();
        assert_eq!(row.average_cost, dec!(6));
        assert_eq!(row.on_hand, dec!(15));

        let summary_a = proj.summary(tenant_a).unwrap();
        assert_eq!(summary_a.products, 2);
        assert_eq!(summary_a.total_value, dec!(92));
        assert_eq!(proj.summary(tenant_b).unwrap().total_value, dec!(100));
        assert!(proj.get(tenant_b, &p1).unwrap().is_none());
    }

    #[test]
    fn poisoned_cursor_lock_is_a_persistence_error() {
        let proj = Arc::new(projection());
        let tenant_id = TenantId::new();
        let product_id = ProductId::generate();
        proj.apply_envelope(&envelope(tenant_id, product_id, 1, dec!(4), Some(dec!(2))))
            .unwrap();

        let poisoner = Arc::clone(&proj);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.cursors.write().unwrap();
            panic!("cursor writer died");
        })
        .join();
        assert!(joined.is_err());

        let err = proj
            .apply_envelope(&envelope(tenant_id, product_id, 2, dec!(1), Some(dec!(2))))
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryValuationError::Store(EngineError::Persistence(_))
        ));
        assert_eq!(proj.get(tenant_id, &product_id).unwrap().unwrap().on_hand, dec!(4));

        let replay = vec![envelope(tenant_id, product_id, 1, dec!(4), Some(dec!(2)))];
        assert!(matches!(
            proj.rebuild_from_scratch(replay),
            Err(InventoryValuationError::Store(EngineError::Persistence(_)))
        ));
    }

    #[test]
    fn payload_from_another_tenant_is_rejected() {
        let proj = projection();
        let owner = TenantId::new();
        let product_id = ProductId::generate();
        let foreign = envelope(TenantId::new(), product_id, 1, dec!(1), Some(dec!(1)));
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            owner,
            product_id.0,
            AGGREGATE_TYPE,
            1,
            "valuation.movement.posted",
            Utc::now(),
            foreign.payload().clone(),
        );

        assert!(matches!(
            proj.apply_envelope(&env),
            Err(InventoryValuationError::TenantIsolation(_))
        ));
        assert!(proj.list(owner).unwrap().is_empty());
    }

    #[test]
    fn ignores_other_aggregate_types() {
        let proj = projection();
        let tenant_id = TenantId::new();
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            tenant_id,
            AggregateId::new(),
            "catalog.product",
            1,
            "catalog.product.created",
            Utc::now(),
            serde_json::json!({}),
        );
        proj.apply_envelope(&env).unwrap();
        assert!(proj.list(tenant_id).unwrap().is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn movement() -> impl Strategy<Value = (i64, Option<i64>)> {
            prop_oneof![
                (1i64..50, 1i64..10_000).prop_map(|(q, c)| (q, Some(c))),
                (-50i64..0).prop_map(|q| (q, None)),
            ]
        }

        proptest! {
            #[test]
            fn projection_agrees_with_ledger_replay(moves in prop::collection::vec(movement(), 1..40)) {
                let proj = projection();
                let tenant_id = TenantId::new();
                let product_id = ProductId::generate();
                let mut ledger = CostLedger::empty(product_id);

                for (i, (qty, cost)) in moves.iter().enumerate() {
                    let env = envelope(
                        tenant_id,
                        product_id,
                        i as u64 + 1,
                        Decimal::from(*qty),
                        cost.map(|c| Decimal::new(c, 2)),
                    );
                    let event: ValuationEvent = serde_json::from_value(env.payload().clone()).unwrap();
                    ledger.apply(&event);
                    proj.apply_envelope(&env).unwrap();
                }

                let row = proj.get(tenant_id, &product_id).unwrap().unwrap();
                prop_assert_eq!(row.on_hand, ledger.state().on_hand);
                prop_assert_eq!(row.average_cost, ledger.state().average_cost);
                prop_assert_eq!(row.last_cost, ledger.state().last_cost);
                prop_assert_eq!(row.version, ledger.state().movements);
                prop_assert!(row.stock_value >= Decimal::ZERO);
            }
        }
    }
}
