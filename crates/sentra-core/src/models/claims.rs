//! Token claim set.
//!
//! A fixed, strongly typed claim structure with an explicit extension
//! map for provider-specific custom claims. Dynamic claim dictionaries
//! stop at the security boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes the two halves of a credential pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims embedded in every Sentra token (access and refresh).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
    /// Tenant the token is scoped to. `None` only before tenant
    /// selection; must always equal the session's tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    /// The session this token belongs to. A token whose session is
    /// terminated never validates again.
    pub session_id: Uuid,
    /// Device fingerprint the session is bound to.
    pub device_id: String,
    /// Refresh-token generation this token was minted under.
    pub generation: u32,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub token_use: TokenUse,
    /// Provider-specific custom claims.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ext: BTreeMap<String, serde_json::Value>,
}

impl TokenClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// A claim set already verified by an external identity provider.
///
/// The engine never speaks provider wire protocols; it receives the
/// verified result and takes it on trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub user_id: Uuid,
    /// Which provider verified the identity (e.g. `oidc:acme`).
    pub provider: String,
    /// Provider-specific claims carried through into issued tokens.
    #[serde(default)]
    pub ext: BTreeMap<String, serde_json::Value>,
}
