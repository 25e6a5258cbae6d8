//! Tenant access gate.
//!
//! Hard isolation between tenants starts here: no session is created
//! and no tenant switch happens without an active membership.

use std::sync::Arc;

use uuid::Uuid;

use sentra_core::error::{SentraError, SentraResult};
use sentra_core::repository::MembershipRepository;

pub struct TenantAccessGuard<M: MembershipRepository> {
    memberships: Arc<M>,
}

impl<M: MembershipRepository> TenantAccessGuard<M> {
    pub fn new(memberships: Arc<M>) -> Self {
        Self { memberships }
    }

    /// Precondition gate for session creation and tenant switches.
    pub async fn check_access(&self, user_id: Uuid, tenant_id: Uuid) -> SentraResult<()> {
        if self.memberships.is_active(user_id, tenant_id).await? {
            Ok(())
        } else {
            Err(SentraError::TenantInactive)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentra_core::models::membership::TenantMembership;
    use sentra_store::MemoryMembershipRepository;

    #[tokio::test]
    async fn active_membership_passes() {
        let memberships = Arc::new(MemoryMembershipRepository::new());
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        memberships.insert(TenantMembership {
            user_id: user,
            tenant_id: tenant,
            role: "member".into(),
            is_active: true,
        });

        let guard = TenantAccessGuard::new(memberships.clone());
        assert!(guard.check_access(user, tenant).await.is_ok());

        memberships.set_active(user, tenant, false);
        let err = guard.check_access(user, tenant).await.unwrap_err();
        assert!(matches!(err, SentraError::TenantInactive));
    }

    #[tokio::test]
    async fn missing_membership_is_inactive() {
        let guard = TenantAccessGuard::new(Arc::new(MemoryMembershipRepository::new()));
        let err = guard
            .check_access(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, SentraError::TenantInactive));
    }
}
