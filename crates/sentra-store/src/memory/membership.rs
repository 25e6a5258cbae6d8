//! In-memory implementation of [`MembershipRepository`].
//!
//! Memberships are read-only to the engine; the mutators here exist
//! for the host application (and tests) to stage state.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::error::SentraResult;
use sentra_core::models::membership::TenantMembership;
use sentra_core::repository::MembershipRepository;

#[derive(Default)]
pub struct MemoryMembershipRepository {
    memberships: RwLock<HashMap<(Uuid, Uuid), TenantMembership>>,
}

impl MemoryMembershipRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, membership: TenantMembership) {
        self.memberships
            .write()
            .insert((membership.user_id, membership.tenant_id), membership);
    }

    pub fn set_active(&self, user_id: Uuid, tenant_id: Uuid, is_active: bool) {
        if let Some(m) = self.memberships.write().get_mut(&(user_id, tenant_id)) {
            m.is_active = is_active;
        }
    }
}

impl MembershipRepository for MemoryMembershipRepository {
    async fn is_active(&self, user_id: Uuid, tenant_id: Uuid) -> SentraResult<bool> {
        Ok(self
            .memberships
            .read()
            .get(&(user_id, tenant_id))
            .is_some_and(|m| m.is_active))
    }
}
