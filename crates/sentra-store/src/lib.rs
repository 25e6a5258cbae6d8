//! Sentra Store — In-memory implementations of the core collaborator
//! traits.
//!
//! Persistent storage is an external concern behind the `sentra-core`
//! trait seam; these implementations back the server binary and every
//! test suite. Interior mutability is `parking_lot` locks held only
//! for the duration of a map operation, never across an await point.

pub mod clock;
pub mod geo;
pub mod memory;

pub use clock::FrozenClock;
pub use geo::StaticGeoLookup;
pub use memory::{
    MemoryActivityRepository, MemoryAuditSink, MemoryDeviceRepository,
    MemoryMembershipRepository, MemoryPolicyRepository, MemoryRevocationStore,
    MemorySessionRepository,
};
