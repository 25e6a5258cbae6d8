//! Token pair domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The bound access + refresh credential issued for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token (three base64url segments).
    pub access_token: String,
    /// Signed refresh token. Single-use: consumed by rotation.
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
    /// Access token expiry. Always earlier than the session expiry.
    pub expires_at: DateTime<Utc>,
    /// Refresh token expiry. Never past the configured max lifetime.
    pub refresh_expires_at: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub session_id: Uuid,
    pub device_id: String,
    pub tenant_id: Option<Uuid>,
    /// Generation this pair was minted under.
    pub generation: u32,
}
