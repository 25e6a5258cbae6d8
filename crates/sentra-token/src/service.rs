//! Token service — issuance, validation, rotation, revocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey};

use sentra_core::clock::Clock;
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::claims::{TokenClaims, TokenUse};
use sentra_core::models::session::{Session, SessionState};
use sentra_core::models::token::TokenPair;
use sentra_core::repository::{RevocationStore, SessionRepository};

use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::token::{self, TokenValidation};

/// Issues, validates, rotates, and revokes credential pairs.
///
/// Generic over the session and revocation stores so the token layer
/// has no dependency on a storage crate.
pub struct TokenService<S: SessionRepository, R: RevocationStore> {
    sessions: Arc<S>,
    revocations: Arc<R>,
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    clock: Arc<dyn Clock>,
}

impl<S: SessionRepository, R: RevocationStore> std::fmt::Debug for TokenService<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl<S: SessionRepository, R: RevocationStore> TokenService<S, R> {
    /// Parses the signing key pair once. A missing or unparseable key
    /// is a configuration error, fatal at startup.
    pub fn new(
        sessions: Arc<S>,
        revocations: Arc<R>,
        config: TokenConfig,
        clock: Arc<dyn Clock>,
    ) -> SentraResult<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_ed_pem(config.signing_key_pem.as_bytes())
            .map_err(|e| SentraError::ConfigurationError {
                reason: format!("bad signing key: {e}"),
            })?;
        let decoding_key = DecodingKey::from_ed_pem(config.verifying_key_pem.as_bytes())
            .map_err(|e| SentraError::ConfigurationError {
                reason: format!("bad verifying key: {e}"),
            })?;

        Ok(Self {
            sessions,
            revocations,
            config,
            encoding_key,
            decoding_key,
            clock,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint an access/refresh pair bound to the session's current
    /// generation. The access token always expires before the session.
    pub fn issue(
        &self,
        session: &Session,
        scopes: &[String],
        ext: &BTreeMap<String, serde_json::Value>,
    ) -> SentraResult<TokenPair> {
        let now = self.clock.now();
        let access_expires = (now
            + Duration::seconds(self.config.access_token_lifetime_secs as i64))
        .min(session.expires_at - Duration::seconds(1));
        let refresh_expires = (now
            + Duration::seconds(self.config.refresh_token_lifetime_secs as i64))
        .min(session.expires_at);

        let access_claims = self.claims_for(session, scopes, ext, now, access_expires, TokenUse::Access);
        let refresh_claims =
            self.claims_for(session, scopes, ext, now, refresh_expires, TokenUse::Refresh);

        let access_token = token::encode_token(&access_claims, &self.encoding_key)
            .map_err(SentraError::from)?;
        let refresh_token = token::encode_token(&refresh_claims, &self.encoding_key)
            .map_err(SentraError::from)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            issued_at: now,
            expires_at: access_expires,
            refresh_expires_at: refresh_expires,
            scopes: scopes.to_vec(),
            session_id: session.id,
            device_id: session.device_id.clone(),
            tenant_id: session.tenant_id,
            generation: session.generation,
        })
    }

    /// Verify signature, expiry, issuer/audience, and revocation state.
    ///
    /// Every failure mode is a value in [`TokenValidation`]; `Err` is
    /// reserved for store failures.
    pub async fn validate_access(&self, raw: &str) -> SentraResult<TokenValidation> {
        let claims = match token::decode_token(
            raw,
            &self.decoding_key,
            &self.config.issuer,
            &self.config.audience,
        ) {
            Ok(claims) => claims,
            Err(TokenError::InvalidSignature) => return Ok(TokenValidation::InvalidSignature),
            Err(TokenError::Malformed(reason)) => {
                return Ok(TokenValidation::Malformed { reason });
            }
            Err(e) => return Err(e.into()),
        };

        if claims.token_use != TokenUse::Access {
            return Ok(TokenValidation::Malformed {
                reason: "not an access token".into(),
            });
        }
        if self.is_expired(claims.exp) {
            return Ok(TokenValidation::Expired);
        }
        if self.is_revoked(&claims).await? {
            return Ok(TokenValidation::Revoked);
        }

        Ok(TokenValidation::Valid(claims))
    }

    /// Decode and fully check a refresh token. Unlike access-token
    /// validation this is error-typed: callers of rotation want `?`.
    pub async fn decode_refresh(&self, raw: &str) -> SentraResult<TokenClaims> {
        let claims = token::decode_token(
            raw,
            &self.decoding_key,
            &self.config.issuer,
            &self.config.audience,
        )
        .map_err(SentraError::from)?;

        if claims.token_use != TokenUse::Refresh {
            return Err(SentraError::Malformed {
                reason: "not a refresh token".into(),
            });
        }
        if self.is_expired(claims.exp) {
            return Err(SentraError::Expired);
        }
        if self.is_revoked(&claims).await? {
            return Err(SentraError::Revoked);
        }

        Ok(claims)
    }

    /// Rotate a refresh token.
    ///
    /// The generation compare-and-swap makes this safe under races: two
    /// concurrent rotations on the same generation produce exactly one
    /// winner, and the loser sees `TokenRotationConflict` rather than a
    /// second live pair. The consumed token's id enters the revocation
    /// store immediately, so a captured stale token can never be
    /// replayed after a legitimate rotation.
    pub async fn rotate(&self, raw: &str) -> SentraResult<TokenPair> {
        // 1. Verify the refresh token itself.
        let claims = self.decode_refresh(raw).await?;

        // 2. The session must still be live.
        let mut session = match self.sessions.get(claims.session_id).await {
            Ok(session) => session,
            Err(SentraError::NotFound { .. }) => return Err(SentraError::Revoked),
            Err(e) => return Err(e),
        };
        if session.state != SessionState::Active {
            return Err(SentraError::Revoked);
        }
        if claims.tenant_id != session.tenant_id {
            return Err(SentraError::TenantMismatch);
        }

        // 3. Compare-and-swap the generation; losers stop here.
        let new_generation = self
            .sessions
            .advance_generation(session.id, claims.generation)
            .await?;

        // 4. The consumed token is dead from this instant.
        let exp = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .unwrap_or_else(|| self.clock.now());
        self.revocations
            .revoke_token(&token::hash_token_id(&claims.jti), exp)
            .await?;

        // 5. Issue the replacement pair under the new generation.
        session.generation = new_generation;
        let pair = self.issue(&session, &claims.scopes, &claims.ext)?;

        tracing::debug!(
            session_id = %session.id,
            generation = new_generation,
            "refresh token rotated"
        );
        Ok(pair)
    }

    /// Revoke a token. Idempotent.
    ///
    /// A refresh token takes its whole generation chain with it (the
    /// session can never refresh again); an access token is revoked
    /// individually by id.
    pub async fn revoke(&self, raw: &str) -> SentraResult<()> {
        let claims = token::decode_token(
            raw,
            &self.decoding_key,
            &self.config.issuer,
            &self.config.audience,
        )
        .map_err(SentraError::from)?;

        match claims.token_use {
            TokenUse::Refresh => {
                self.revocations.revoke_session(claims.session_id).await?;
            }
            TokenUse::Access => {
                let exp = DateTime::<Utc>::from_timestamp(claims.exp, 0)
                    .unwrap_or_else(|| self.clock.now());
                self.revocations
                    .revoke_token(&token::hash_token_id(&claims.jti), exp)
                    .await?;
            }
        }
        Ok(())
    }

    fn claims_for(
        &self,
        session: &Session,
        scopes: &[String],
        ext: &BTreeMap<String, serde_json::Value>,
        now: DateTime<Utc>,
        expires: DateTime<Utc>,
        token_use: TokenUse,
    ) -> TokenClaims {
        TokenClaims {
            sub: session.user_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: token::new_jti(),
            tenant_id: session.tenant_id,
            session_id: session.id,
            device_id: session.device_id.clone(),
            generation: session.generation,
            scopes: scopes.to_vec(),
            token_use,
            ext: ext.clone(),
        }
    }

    fn is_expired(&self, exp: i64) -> bool {
        exp + self.config.leeway_secs as i64 <= self.clock.now().timestamp()
    }

    async fn is_revoked(&self, claims: &TokenClaims) -> SentraResult<bool> {
        if self
            .revocations
            .is_token_revoked(&token::hash_token_id(&claims.jti))
            .await?
        {
            return Ok(true);
        }
        if self.revocations.is_session_revoked(claims.session_id).await? {
            return Ok(true);
        }
        let min = self.revocations.min_generation(claims.session_id).await?;
        Ok(claims.generation < min)
    }
}
