use std::collections::HashMap;
use std::sync::RwLock;

use pricewise_core::{AggregateId, ExpectedVersion, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct StreamKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

/// In-memory append-only event store for tests and single-process use.
///
/// The version check and the push happen under one write lock, which is what
/// linearizes concurrent appends to the same stream.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn poisoned() -> EventStoreError {
        EventStoreError::Unavailable("event store lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        let tenant_id = first.tenant_id;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.tenant_id != tenant_id {
                return Err(EventStoreError::TenantIsolation(format!(
                    "batch contains multiple tenant_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };

        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;
        let stream = streams.entry(key).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();

        stream.extend(committed.iter().cloned());
        Ok(committed)
    }

    async fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let key = StreamKey {
            tenant_id,
            aggregate_id,
        };
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.get(&key).cloned().unwrap_or_default())
    }

    async fn load_by_aggregate_type(
        &self,
        tenant_id: TenantId,
        aggregate_type: &str,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        let mut events: Vec<StoredEvent> = streams
            .iter()
            .filter(|(k, _)| k.tenant_id == tenant_id)
            .flat_map(|(_, stream)| stream.iter())
            .filter(|e| e.aggregate_type == aggregate_type)
            .cloned()
            .collect();
        events.sort_by_key(|e| (*e.aggregate_id.as_uuid(), e.sequence_number));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(tenant_id: TenantId, aggregate_id: AggregateId, kind: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: kind.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn assigns_sequence_numbers_and_checks_version() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let agg = AggregateId::new();

        let committed = store
            .append(
                vec![event(tenant_id, agg, "t"), event(tenant_id, agg, "t")],
                ExpectedVersion::Exact(0),
            )
            .await
            .unwrap();
        assert_eq!(
            committed.iter().map(|e| e.sequence_number).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let stale = store
            .append(vec![event(tenant_id, agg, "t")], ExpectedVersion::Exact(1))
            .await;
        assert!(matches!(stale, Err(EventStoreError::Concurrency(_))));
        assert_eq!(store.load_stream(tenant_id, agg).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn streams_are_tenant_isolated() {
        let store = InMemoryEventStore::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let agg = AggregateId::new();

        store
            .append(vec![event(tenant_a, agg, "t")], ExpectedVersion::Any)
            .await
            .unwrap();

        assert!(store.load_stream(tenant_b, agg).await.unwrap().is_empty());
        assert!(
            store
                .load_by_aggregate_type(tenant_b, "t")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn rejects_mixed_batches_atomically() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let agg = AggregateId::new();

        let mixed = vec![event(tenant_id, agg, "t"), event(TenantId::new(), agg, "t")];
        let err = store.append(mixed, ExpectedVersion::Any).await.unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
        assert!(store.load_stream(tenant_id, agg).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn aggregate_type_is_fixed_per_stream() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let agg = AggregateId::new();

        store
            .append(vec![event(tenant_id, agg, "a")], ExpectedVersion::Any)
            .await
            .unwrap();
        let err = store
            .append(vec![event(tenant_id, agg, "b")], ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }
}
