//! Event primitives shared by event-sourced domain crates.
//!
//! Stock movements are the only event stream the engine owns: they are facts,
//! appended once and replayed in order to rebuild cost state.

pub mod command;
pub mod envelope;
pub mod event;
pub mod tenant;

pub use command::Command;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use tenant::TenantScoped;
