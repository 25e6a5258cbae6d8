//! Device domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trust assigned to a device fingerprint.
///
/// Ordered: trust never escalates implicitly from usage frequency;
/// only an explicit grant raises it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrustLevel {
    /// Explicitly demoted or attestation-failed.
    Untrusted,
    /// Known device, no explicit grant.
    Basic,
    /// Explicitly granted by the user or an admin.
    Trusted,
    /// Explicit grant plus hardware attestation capability.
    HighlyTrusted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
    Web,
    Desktop,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Stable fingerprint supplied by the client.
    pub device_id: String,
    pub platform: Platform,
    pub capabilities: Vec<String>,
    pub trust_level: TrustLevel,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Capability string that allows a grant to reach `HighlyTrusted`.
pub const CAP_HARDWARE_ATTESTATION: &str = "hardware_attestation";

/// Device description supplied by the caller on each authentication.
///
/// The attestation signals (`jailbroken`, `emulator`) are produced by
/// an external device-attestation collaborator; the engine does not
/// detect them itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub fingerprint: String,
    pub platform: Platform,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub jailbroken: bool,
    #[serde(default)]
    pub emulator: bool,
}
