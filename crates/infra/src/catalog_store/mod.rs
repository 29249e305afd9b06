//! Tenant-scoped catalog reads (products, price lists, packaging).

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use r#trait::CatalogStore;
