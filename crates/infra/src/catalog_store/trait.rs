use std::sync::Arc;

use pricewise_catalog::{
    ListType, PackagingProfile, PartyId, PriceList, PriceListEntry, PriceListId, Product, ProductId,
};
use pricewise_core::TenantId;

use crate::error::EngineResult;

/// Read side of catalog management, as the engine sees it.
///
/// Every lookup is scoped to the tenant passed in; a record owned by another
/// tenant is indistinguishable from a missing one.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<Product>>;

    async fn price_list(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
    ) -> EngineResult<Option<PriceList>>;

    /// The tenant's default list for `list_type`, active or not.
    async fn default_price_list(
        &self,
        tenant_id: TenantId,
        list_type: ListType,
    ) -> EngineResult<Option<PriceList>>;

    async fn entry(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
        product_id: ProductId,
    ) -> EngineResult<Option<PriceListEntry>>;

    /// List assigned to a party, if any.
    async fn party_price_list(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> EngineResult<Option<PriceListId>>;

    async fn packaging(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<PackagingProfile>>;
}

#[async_trait::async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<Product>> {
        (**self).product(tenant_id, product_id).await
    }

    async fn price_list(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
    ) -> EngineResult<Option<PriceList>> {
        (**self).price_list(tenant_id, price_list_id).await
    }

    async fn default_price_list(
        &self,
        tenant_id: TenantId,
        list_type: ListType,
    ) -> EngineResult<Option<PriceList>> {
        (**self).default_price_list(tenant_id, list_type).await
    }

    async fn entry(
        &self,
        tenant_id: TenantId,
        price_list_id: PriceListId,
        product_id: ProductId,
    ) -> EngineResult<Option<PriceListEntry>> {
        (**self).entry(tenant_id, price_list_id, product_id).await
    }

    async fn party_price_list(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> EngineResult<Option<PriceListId>> {
        (**self).party_price_list(tenant_id, party_id).await
    }

    async fn packaging(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> EngineResult<Option<PackagingProfile>> {
        (**self).packaging(tenant_id, product_id).await
    }
}
