//! Session service configuration.

/// Engine-level knobs. Tenant-specific behavior (lifetimes, limits,
/// thresholds) lives in [`sentra_core::models::policy::TenantPolicy`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Budget for the external geolocation lookup. On timeout the
    /// lookup result is treated as unknown; scoring and geofencing
    /// fail closed from there.
    pub geo_lookup_timeout_ms: u64,
    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            geo_lookup_timeout_ms: 1_500,
            event_channel_capacity: 64,
        }
    }
}
