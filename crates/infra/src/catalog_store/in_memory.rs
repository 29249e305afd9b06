use std::collections::HashMap;
use std::sync::RwLock;

use pricewise_catalog::{
    ListType, PackagingProfile, PartyId, PartyPriceAssignment, PriceList, PriceListEntry,
    PriceListId, Product, ProductId,
};
use pricewise_core::TenantId;

use super::r#trait::CatalogStore;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Default)]
struct TenantCatalog {
    products: HashMap<ProductId, Product>,
    price_lists: HashMap<PriceListId, PriceList>,
    entries: HashMap<(PriceListId, ProductId), PriceListEntry>,
    assignments: HashMap<PartyId, PriceListId>,
    packaging: HashMap<ProductId, PackagingProfile>,
}

/// In-memory catalog with the write-side rules catalog management must keep:
///
/// - at most one default list per (tenant, list type)
/// - at most one entry per (list, product)
/// - entries satisfy their own invariants and reference existing records
/// - party assignments point at sales lists only
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tenants: RwLock<HashMap<TenantId, TenantCatalog>>,
}

fn poisoned() -> EngineError {
    EngineError::Persistence("catalog store lock poisoned".to_string())
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, tenant_id: TenantId, f: impl FnOnce(&TenantCatalog) -> T) -> EngineResult<Option<T>> {
        let tenants = self.tenants.read().map_err(|_| poisoned())?;
        Ok(tenants.get(&tenant_id).map(f))
    }

    fn write<T>(
        &self,
        tenant_id: TenantId,
        f: impl FnOnce(&mut TenantCatalog) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let mut tenants = self.tenants.write().map_err(|_| poisoned())?;
        f(tenants.entry(tenant_id).or_default())
    }

    pub fn upsert_product(&self, product: Product) -> EngineResult<()> {
        product.validate()?;
        self.write(product.tenant_id, |c| {
            c.products.insert(product.id, product);
            Ok(())
        })
    }

    pub fn upsert_price_list(&self, list: PriceList) -> EngineResult<()> {
        list.validate()?;
        self.write(list.tenant_id, |c| {
            if list.is_default {
                let other_default = c
                    .price_lists
                    .values()
                    .any(|l| l.is_default && l.list_type == list.list_type && l.id != list.id);
                if other_default {
                    return Err(EngineError::Validation(format!(
                        "tenant already has a default {} price list",
                        list.list_type
                    )));
                }
            }
            if list.list_type != ListType::Sales && c.assignments.values().any(|id| *id == list.id)
            {
                return Err(EngineError::Validation(
                    "price list is assigned to parties and must stay a sales list".to_string(),
                ));
            }
            c.price_lists.insert(list.id, list);
            Ok(())
        })
    }

    pub fn upsert_entry(&self, entry: PriceListEntry) -> EngineResult<()> {
        entry.validate()?;
        self.write(entry.tenant_id, |c| {
            if !c.price_lists.contains_key(&entry.price_list_id) {
                return Err(EngineError::NotFound(format!(
                    "price list {}",
                    entry.price_list_id
                )));
            }
            if !c.products.contains_key(&entry.product_id) {
                return Err(EngineError::NotFound(format!("product {}", entry.product_id)));
            }

            let key = (entry.price_list_id, entry.product_id);
            if let Some(existing) = c.entries.get(&key) {
                if existing.id != entry.id {
                    return Err(EngineError::Validation(format!(
                        "product {} already has an entry on price list {}",
                        entry.product_id, entry.price_list_id
                    )));
                }
            }
            c.entries.insert(key, entry);
            Ok(())
        })
    }

    pub fn assign_party(&self, assignment: PartyPriceAssignment) -> EngineResult<()> {
        self.write(assignment.tenant_id, |c| {
            let list = c.price_lists.get(&assignment.price_list_id).ok_or_else(|| {
                EngineError::NotFound(format!("price list {}", assignment.price_list_id))
            })?;
            if list.list_type != ListType::Sales {
                return Err(EngineError::Validation(
                    "parties can only be assigned sales price lists".to_string(),
                ));
            }
            c.assignments
                .insert(assignment.party_id, assignment.price_list_id);
            Ok(())
        })
    }

    pub fn upsert_packaging(&self, tenant_id: TenantId, profile: PackagingProfile) -> EngineResult<()> {
        profile.validate()?;
        let product_id = profile
            .product_id
            .ok_or_else(|| EngineError::Validation("packaging profile needs a product".to_string()))?;
        self.write(tenant_id, |c| {
            if !c.products.contains_key(&product_id) {
                return Err(EngineError::NotFound(format!("product {product_id}")));
            }
            c.packaging.insert(product_id, profile);
            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<Product>> {
        Ok(self
            .read(tenant_id, |c| c.products.get(&product_id).cloned())?
            .flatten())
    }

    async fn price_list(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
    ) -> EngineResult<Option<PriceList>> {
        Ok(self
            .read(tenant_id, |c| c.price_lists.get(&price_list_id).cloned())?
            .flatten())
    }

    async fn default_price_list(
        &self,
        tenant_id: TenantId,
        list_type: ListType,
    ) -> EngineResult<Option<PriceList>> {
        Ok(self
            .read(tenant_id, |c| {
                c.price_lists
                    .values()
                    .find(|l| l.is_default && l.list_type == list_type)
                    .cloned()
            })?
            .flatten())
    }

    async fn entry(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
        product_id: ProductId,
    ) -> EngineResult<Option<PriceListEntry>> {
        Ok(self
            .read(tenant_id, |c| c.entries.get(&(price_list_id, product_id)).cloned())?
            .flatten())
    }

    async fn party_price_list(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> EngineResult<Option<PriceListId>> {
        Ok(self
            .read(tenant_id, |c| c.assignments.get(&party_id).copied())?
            .flatten())
    }

    async fn packaging(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<PackagingProfile>> {
        Ok(self
            .read(tenant_id, |c| c.packaging.get(&product_id).cloned())?
            .flatten())
    }
}
