//! Catalog records read by the pricing engine.
//!
//! Catalog management owns creation and edits; the engine only reads these
//! records. Each type validates its own invariants so a store can refuse a bad
//! write before it lands.

pub mod packaging;
pub mod price_list;
pub mod product;

pub use packaging::{DerivedQuantities, PackagingAlignment, PackagingProfile};
pub use price_list::{
    ListType, PartyId, PartyPriceAssignment, PriceList, PriceListEntry, PriceListEntryId,
    PriceListId,
};
pub use product::{Product, ProductId, ProductStatus};
