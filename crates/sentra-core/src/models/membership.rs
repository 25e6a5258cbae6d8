//! Tenant membership domain model.
//!
//! Read-only to this engine: the engine only asks whether a membership
//! is active. Membership lifecycle is managed elsewhere.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: String,
    pub is_active: bool,
}
