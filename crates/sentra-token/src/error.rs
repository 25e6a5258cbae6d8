//! Token error types.

use sentra_core::SentraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has been revoked")]
    Revoked,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("refresh token generation is stale")]
    RotationConflict,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<TokenError> for SentraError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => SentraError::Expired,
            TokenError::InvalidSignature => SentraError::InvalidSignature,
            TokenError::Revoked => SentraError::Revoked,
            TokenError::Malformed(reason) => SentraError::Malformed { reason },
            TokenError::RotationConflict => SentraError::TokenRotationConflict,
            TokenError::Crypto(msg) => SentraError::Internal(msg),
        }
    }
}
