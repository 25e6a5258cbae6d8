//! Collaborator trait definitions for data access and external lookups.
//!
//! All operations are async. Sessions, devices, and revocations are
//! shared mutable state reached from many concurrent logical
//! operations; implementations must serialize per-session mutation
//! (the generation compare-and-swap in [`SessionRepository`] is the
//! canonical mechanism).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SentraResult;
use crate::models::{
    activity::{ActivityEvent, GeoIntel},
    audit::SecurityEvent,
    device::{Device, DeviceInfo, TrustLevel},
    policy::TenantPolicy,
    session::{CreateSession, SecurityLevel, Session, SessionState, TerminationReason},
};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = SentraResult<Session>> + Send;

    fn get(&self, id: Uuid) -> impl Future<Output = SentraResult<Session>> + Send;

    /// Look up the session created by a prior login attempt, if any.
    /// Backs idempotent session creation across provider-timeout retries.
    fn find_by_attempt(
        &self,
        attempt_id: Uuid,
    ) -> impl Future<Output = SentraResult<Option<Session>>> + Send;

    /// Active sessions for a user, optionally narrowed to one tenant.
    fn list_active_for_user(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> impl Future<Output = SentraResult<Vec<Session>>> + Send;

    /// Update `last_accessed_at`.
    fn touch(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn set_state(
        &self,
        id: Uuid,
        state: SessionState,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn set_security_level(
        &self,
        id: Uuid,
        level: SecurityLevel,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    /// Compare-and-swap on the generation counter: succeeds and returns
    /// the new generation only when `expected` matches the stored value.
    /// Exactly one of two concurrent rotations can win; the loser gets
    /// `TokenRotationConflict`.
    fn advance_generation(
        &self,
        id: Uuid,
        expected: u32,
    ) -> impl Future<Output = SentraResult<u32>> + Send;

    /// Soft-delete: flips state to `Terminated`, keeps the record.
    /// Idempotent on already-terminal sessions.
    fn terminate(
        &self,
        id: Uuid,
        reason: TerminationReason,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Session>> + Send;

    /// Terminate every active session of a user, optionally sparing one
    /// device. Returns the sessions that were terminated.
    fn terminate_all_for_user(
        &self,
        user_id: Uuid,
        exclude_device: Option<&str>,
        reason: TerminationReason,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Vec<Session>>> + Send;

    /// Flip past-expiry active sessions to `Expired`. Returns the count.
    fn sweep_expired(&self, now: DateTime<Utc>) -> impl Future<Output = SentraResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

pub trait DeviceRepository: Send + Sync {
    fn get(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> impl Future<Output = SentraResult<Option<Device>>> + Send;

    /// Create the device on first sight or refresh `last_seen_at`.
    /// Never changes the trust level of an existing device.
    fn upsert_seen(
        &self,
        user_id: Uuid,
        info: &DeviceInfo,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<Device>> + Send;

    fn set_trust(
        &self,
        user_id: Uuid,
        device_id: &str,
        level: TrustLevel,
    ) -> impl Future<Output = SentraResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Token revocation
// ---------------------------------------------------------------------------

/// Revocation record shared between issuance and validation.
///
/// Three layers: individual token ids (hashed), whole sessions
/// (termination kills every token forever), and a per-session minimum
/// generation (quarantine invalidates earlier generations while letting
/// post-reauthentication tokens through).
pub trait RevocationStore: Send + Sync {
    /// Idempotent. `expires_at` bounds how long the entry must be kept.
    fn revoke_token(
        &self,
        jti_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn is_token_revoked(&self, jti_hash: &str) -> impl Future<Output = SentraResult<bool>> + Send;

    fn revoke_session(&self, session_id: Uuid) -> impl Future<Output = SentraResult<()>> + Send;

    fn is_session_revoked(&self, session_id: Uuid)
    -> impl Future<Output = SentraResult<bool>> + Send;

    /// Tokens of this session with `generation < min` are revoked.
    fn set_min_generation(
        &self,
        session_id: Uuid,
        min: u32,
    ) -> impl Future<Output = SentraResult<()>> + Send;

    fn min_generation(&self, session_id: Uuid) -> impl Future<Output = SentraResult<u32>> + Send;

    /// Drop token entries past their expiry. Returns the count removed.
    fn prune(&self, now: DateTime<Utc>) -> impl Future<Output = SentraResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Memberships, policies
// ---------------------------------------------------------------------------

pub trait MembershipRepository: Send + Sync {
    fn is_active(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = SentraResult<bool>> + Send;
}

pub trait PolicyRepository: Send + Sync {
    /// Tenant policy, or the platform default when the tenant has none
    /// (or no tenant is selected yet).
    fn policy_for(
        &self,
        tenant_id: Option<Uuid>,
    ) -> impl Future<Output = SentraResult<TenantPolicy>> + Send;
}

// ---------------------------------------------------------------------------
// Activity log (append-only)
// ---------------------------------------------------------------------------

pub trait ActivityRepository: Send + Sync {
    fn append(&self, event: ActivityEvent) -> impl Future<Output = SentraResult<()>> + Send;

    /// Ordered history for one session.
    fn for_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = SentraResult<Vec<ActivityEvent>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit sink (external collaborator)
// ---------------------------------------------------------------------------

pub trait AuditSink: Send + Sync {
    /// Append a security event. No update or delete operations exist.
    fn record(&self, event: SecurityEvent) -> impl Future<Output = SentraResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Geolocation / IP reputation (external collaborator)
// ---------------------------------------------------------------------------

pub trait GeoLookup: Send + Sync {
    /// `Ok(None)` when the address cannot be resolved; scoring treats
    /// that as an unknown location.
    fn locate(&self, ip: &str) -> impl Future<Output = SentraResult<Option<GeoIntel>>> + Send;
}
