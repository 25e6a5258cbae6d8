//! Shared application state.

use std::sync::Arc;

use sentra_session::SessionService;
use sentra_store::{
    MemoryActivityRepository, MemoryAuditSink, MemoryDeviceRepository,
    MemoryMembershipRepository, MemoryPolicyRepository, MemoryRevocationStore,
    MemorySessionRepository, StaticGeoLookup,
};

/// The engine wired to the in-memory stores.
pub type Engine = SessionService<
    MemorySessionRepository,
    MemoryRevocationStore,
    MemoryDeviceRepository,
    MemoryMembershipRepository,
    MemoryPolicyRepository,
    MemoryActivityRepository,
    MemoryAuditSink,
    StaticGeoLookup,
>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}
