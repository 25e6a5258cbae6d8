//! Session domain model.
//!
//! A session is the authoritative record of one authenticated
//! user/device/tenant context. Sessions are created once per successful
//! authentication, mutated only through the session store, and
//! soft-deleted (state flips, record kept for audit) on termination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle state.
///
/// `Pending` covers the window between claim verification and token
/// issuance. `Expired` and `Terminated` are terminal; `Quarantined`
/// may return to `Active` only through explicit re-authentication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Active,
    Expired,
    Terminated,
    Quarantined,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Expired | SessionState::Terminated)
    }
}

/// Security posture assigned to a session at creation and adjusted by
/// policy enforcement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Default posture.
    Standard,
    /// Trusted device, low risk.
    Elevated,
    /// Policy downgrade; re-authentication required before the session
    /// is considered fully valid again.
    Restricted,
}

/// Why a session was terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TerminationReason {
    Logout,
    LogoutEverywhere,
    Evicted,
    MembershipDeactivated,
    PolicyViolation,
    TenantSwitch,
    CreationFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `None` only before tenant selection. Once set, immutable; a
    /// tenant switch creates a new session rather than mutating this.
    pub tenant_id: Option<Uuid>,
    /// Stable device fingerprint.
    pub device_id: String,
    pub ip_address: Option<String>,
    pub state: SessionState,
    pub security_level: SecurityLevel,
    /// Monotonically increasing refresh-token generation counter.
    /// At most one generation is valid per session at any instant.
    pub generation: u32,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub termination_reason: Option<TerminationReason>,
    /// Scopes granted at authentication; tokens inherit them.
    pub scopes: Vec<String>,
    /// Idempotency key of the login attempt that created this session.
    pub attempt_id: Option<Uuid>,
}

/// Fields required to create a new session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub device_id: String,
    pub ip_address: Option<String>,
    pub security_level: SecurityLevel,
    pub expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub attempt_id: Option<Uuid>,
}

/// Reduced view of a session for multi-device management listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub device_id: String,
    pub ip_address: Option<String>,
    pub security_level: SecurityLevel,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            device_id: s.device_id.clone(),
            ip_address: s.ip_address.clone(),
            security_level: s.security_level,
            created_at: s.created_at,
            last_accessed_at: s.last_accessed_at,
            expires_at: s.expires_at,
        }
    }
}
