//! Error types for the Sentra engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentraError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has been revoked")]
    Revoked,

    #[error("malformed token: {reason}")]
    Malformed { reason: String },

    #[error("tenant membership is not active")]
    TenantInactive,

    #[error("token tenant does not match session tenant")]
    TenantMismatch,

    #[error("device is not trusted")]
    DeviceNotTrusted,

    #[error("concurrent session limit of {limit} exceeded")]
    ConcurrentLimitExceeded { limit: u32 },

    #[error("refresh token generation is stale")]
    TokenRotationConflict,

    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String },

    #[error("session quarantined by risk policy")]
    RiskQuarantine,

    #[error("configuration error: {reason}")]
    ConfigurationError { reason: String },

    #[error("external dependency unavailable: {dependency}")]
    ExternalDependencyUnavailable { dependency: String },

    #[error("entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SentraResult<T> = Result<T, SentraError>;
