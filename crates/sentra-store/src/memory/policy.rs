//! In-memory implementation of [`PolicyRepository`].

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::error::SentraResult;
use sentra_core::models::policy::TenantPolicy;
use sentra_core::repository::PolicyRepository;

pub struct MemoryPolicyRepository {
    policies: RwLock<HashMap<Uuid, TenantPolicy>>,
    default: TenantPolicy,
}

impl MemoryPolicyRepository {
    pub fn new() -> Self {
        Self::with_default(TenantPolicy::default())
    }

    /// Override the platform default used when a tenant has no policy.
    pub fn with_default(default: TenantPolicy) -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
            default,
        }
    }

    pub fn set(&self, tenant_id: Uuid, policy: TenantPolicy) {
        self.policies.write().insert(tenant_id, policy);
    }
}

impl Default for MemoryPolicyRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyRepository for MemoryPolicyRepository {
    async fn policy_for(&self, tenant_id: Option<Uuid>) -> SentraResult<TenantPolicy> {
        let policy = tenant_id
            .and_then(|id| self.policies.read().get(&id).cloned())
            .unwrap_or_else(|| self.default.clone());
        Ok(policy)
    }
}
