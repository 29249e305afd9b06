use pricewise_core::{AggregateId, TenantId};

/// A command targets a specific aggregate stream.
///
/// Commands are intent ("post +10 units at cost 5"); events are the accepted
/// facts. A rejected command leaves the stream untouched.
///
/// Unlike envelopes, commands carry the tenant explicitly so that nothing in the
/// pipeline has to consult ambient request state.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn tenant_id(&self) -> TenantId;

    fn target_aggregate_id(&self) -> AggregateId;
}
