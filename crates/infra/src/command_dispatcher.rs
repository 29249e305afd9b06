//! Command execution for event-sourced aggregates.
//!
//! ```text
//! load stream (tenant-scoped) → validate → rehydrate → handle → append(Exact(version))
//! ```
//!
//! The append carries the version the decision was based on, so two commands
//! racing on one stream cannot both commit: the loser gets a concurrency error
//! and nothing of it is persisted.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use pricewise_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use pricewise_events::Event;

use crate::error::{EngineError, EngineResult};
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Outcome of a successful dispatch.
#[derive(Debug)]
pub struct Dispatched<A> {
    /// Aggregate with the new events applied.
    pub aggregate: A,
    pub committed: Vec<StoredEvent>,
}

#[derive(Debug, Clone)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: EventStore> CommandDispatcher<S> {
    /// Rehydrate an aggregate from its stream without handling anything.
    pub async fn load<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> EngineResult<A>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(tenant_id, aggregate_id).await?;
        validate_loaded_stream(tenant_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(tenant_id, aggregate_id);
        apply_history(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    pub async fn dispatch<A>(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(TenantId, AggregateId) -> A,
    ) -> EngineResult<Dispatched<A>>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let mut aggregate = self.load(tenant_id, aggregate_id, make_aggregate).await?;
        let expected = ExpectedVersion::Exact(aggregate.version());

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                aggregate,
                committed: vec![],
            });
        }

        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    tenant_id,
                    aggregate_id,
                    aggregate_type,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected).await?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        Ok(Dispatched {
            aggregate,
            committed,
        })
    }
}

fn validate_loaded_stream(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> EngineResult<()> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.tenant_id != tenant_id {
            return Err(EngineError::TenantIsolation(format!(
                "loaded stream contains wrong tenant_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(EngineError::TenantIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))
            .into());
        }
        last = e.sequence_number;
    }
    Ok(())
}

/// Apply stored events in sequence order.
pub fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> EngineResult<()>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let mut sorted: Vec<&StoredEvent> = history.iter().collect();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| EventStoreError::Serialization(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}
