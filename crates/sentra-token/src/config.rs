//! Token service configuration.

use sentra_core::{SentraError, SentraResult};

/// Configuration for token issuance and verification.
///
/// There is deliberately no `Default`: a signing key must be
/// provisioned explicitly, never fall back to a built-in value.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// PEM-encoded Ed25519 private key for signing.
    pub signing_key_pem: String,
    /// PEM-encoded Ed25519 public key for verification.
    pub verifying_key_pem: String,
    /// Access token lifetime in seconds (default: 3600 = 1 hour).
    pub access_token_lifetime_secs: u64,
    /// Max refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// Issuer (`iss` claim).
    pub issuer: String,
    /// Audience (`aud` claim).
    pub audience: String,
    /// Clock skew tolerance for expiry checks, in seconds.
    pub leeway_secs: u64,
}

impl TokenConfig {
    pub fn new(signing_key_pem: impl Into<String>, verifying_key_pem: impl Into<String>) -> Self {
        Self {
            signing_key_pem: signing_key_pem.into(),
            verifying_key_pem: verifying_key_pem.into(),
            access_token_lifetime_secs: 3_600,
            refresh_token_lifetime_secs: 2_592_000,
            issuer: "sentra".into(),
            audience: "sentra-api".into(),
            leeway_secs: 60,
        }
    }

    /// Fatal at startup, not recoverable per-request.
    pub fn validate(&self) -> SentraResult<()> {
        if self.signing_key_pem.trim().is_empty() || self.verifying_key_pem.trim().is_empty() {
            return Err(SentraError::ConfigurationError {
                reason: "signing key pair must be explicitly provisioned".into(),
            });
        }
        if self.access_token_lifetime_secs == 0 || self.refresh_token_lifetime_secs == 0 {
            return Err(SentraError::ConfigurationError {
                reason: "token lifetimes must be non-zero".into(),
            });
        }
        if self.access_token_lifetime_secs > self.refresh_token_lifetime_secs {
            return Err(SentraError::ConfigurationError {
                reason: "access token lifetime exceeds refresh lifetime".into(),
            });
        }
        Ok(())
    }
}
