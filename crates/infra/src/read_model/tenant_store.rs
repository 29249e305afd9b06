use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use pricewise_core::TenantId;

use crate::error::{EngineError, EngineResult};

/// Tenant-partitioned key/value storage for disposable read models.
///
/// A tenant's partition can be dropped wholesale for rebuilds.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> EngineResult<Option<V>>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> EngineResult<()>;
    fn list(&self, tenant_id: TenantId) -> EngineResult<Vec<V>>;
    fn clear_tenant(&self, tenant_id: TenantId) -> EngineResult<()>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> EngineResult<Option<V>> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> EngineResult<()> {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, tenant_id: TenantId) -> EngineResult<Vec<V>> {
        (**self).list(tenant_id)
    }

    fn clear_tenant(&self, tenant_id: TenantId) -> EngineResult<()> {
        (**self).clear_tenant(tenant_id)
    }
}

#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    partitions: RwLock<HashMap<TenantId, HashMap<K, V>>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> EngineError {
    EngineError::Persistence("read model lock poisoned".to_string())
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> EngineResult<Option<V>> {
        let partitions = self.partitions.read().map_err(|_| poisoned())?;
        Ok(partitions
            .get(&tenant_id)
            .and_then(|p| p.get(key))
            .cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> EngineResult<()> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        partitions.entry(tenant_id).or_default().insert(key, value);
        Ok(())
    }

    fn list(&self, tenant_id: TenantId) -> EngineResult<Vec<V>> {
        let partitions = self.partitions.read().map_err(|_| poisoned())?;
        Ok(partitions
            .get(&tenant_id)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    fn clear_tenant(&self, tenant_id: TenantId) -> EngineResult<()> {
        let mut partitions = self.partitions.write().map_err(|_| poisoned())?;
        partitions.remove(&tenant_id);
        Ok(())
    }
}
