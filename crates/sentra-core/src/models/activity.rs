//! Session activity events and geolocation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityKind {
    Login,
    TokenRefresh,
    ApiRequest,
    ValidationFailure,
    StepUpCompleted,
    Logout,
}

/// A resolved geographic point, ISO alpha-2 country code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
}

/// Result of the injected geolocation / IP-reputation lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIntel {
    pub point: GeoPoint,
    /// VPN / Tor / proxy signal from the reputation side of the lookup.
    pub anonymizing_network: bool,
}

/// One observation of session activity. Appended, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub location: Option<GeoPoint>,
    pub ip_address: Option<String>,
    /// Caller-supplied base contribution, e.g. a provider-side fraud
    /// signal. Added on top of the detector's own factors.
    pub risk_contribution: f64,
    /// Anonymizing-network signal resolved for this event.
    pub anonymizing_network: bool,
}
