//! Tenant security policy.
//!
//! Configured per tenant; absent fields fall back to the platform
//! defaults below. Read by the policy engine, never mutated by the
//! engine itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantPolicy {
    pub max_concurrent_sessions: u32,
    /// When the limit is hit, terminate the oldest active session
    /// instead of rejecting the new login.
    pub evict_oldest_on_limit: bool,
    /// Hard session lifetime (refresh horizon).
    pub session_lifetime_secs: u64,
    /// Idle window after which a session requires re-authentication
    /// even though its tokens are still unexpired.
    pub idle_timeout_secs: u64,
    /// ISO alpha-2 codes. Empty list = no geofence.
    pub allowed_countries: Vec<String>,
    pub blocked_countries: Vec<String>,
    /// Require an explicitly trusted device for session creation.
    pub require_device_trust: bool,
    pub max_failed_validations: u32,
    pub lockout_duration_secs: u64,
    /// Risk score bands. Tunable per tenant.
    pub risk_flag_threshold: f64,
    pub risk_step_up_threshold: f64,
    pub risk_quarantine_threshold: f64,
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 5,
            evict_oldest_on_limit: true,
            session_lifetime_secs: 2_592_000,
            idle_timeout_secs: 1_800,
            allowed_countries: Vec::new(),
            blocked_countries: Vec::new(),
            require_device_trust: false,
            max_failed_validations: 5,
            lockout_duration_secs: 300,
            risk_flag_threshold: 0.3,
            risk_step_up_threshold: 0.6,
            risk_quarantine_threshold: 0.85,
        }
    }
}
