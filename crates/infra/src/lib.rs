//! Infrastructure layer: store boundaries, the engine service, configuration.
//!
//! Domain crates stay pure; everything that suspends lives here.

pub mod catalog_store;
pub mod clock;
pub mod command_dispatcher;
pub mod config;
pub mod engine;
pub mod error;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod retry;

pub use catalog_store::{CatalogStore, InMemoryCatalogStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use command_dispatcher::{CommandDispatcher, Dispatched};
pub use crate::config::{EngineConfig, RetryConfig};
pub use engine::PricingEngine;
pub use error::{EngineError, EngineResult};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore};
pub use retry::retry_with_backoff;
