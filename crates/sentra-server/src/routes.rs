//! HTTP handlers for the session engine API.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sentra_core::SentraError;
use sentra_core::models::claims::{TokenClaims, VerifiedIdentity};
use sentra_core::models::device::DeviceInfo;
use sentra_core::models::session::{SessionSummary, TerminationReason};
use sentra_session::CreateSessionInput;
use sentra_token::TokenValidation;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "sentra ok" }))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}/refresh", post(refresh_session))
        .route("/sessions/{id}", delete(terminate_session))
        .route("/tokens/validate", post(validate_token))
        .route("/users/{id}/sessions", get(list_sessions).delete(terminate_all))
        .with_state(state)
}

/// [`SentraError`] mapped onto HTTP status codes.
struct ApiError(SentraError);

impl From<SentraError> for ApiError {
    fn from(err: SentraError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SentraError::TokenRotationConflict => StatusCode::CONFLICT,
            SentraError::Expired
            | SentraError::InvalidSignature
            | SentraError::Revoked
            | SentraError::Malformed { .. } => StatusCode::UNAUTHORIZED,
            SentraError::TenantInactive
            | SentraError::TenantMismatch
            | SentraError::DeviceNotTrusted
            | SentraError::PolicyViolation { .. }
            | SentraError::RiskQuarantine => StatusCode::FORBIDDEN,
            SentraError::ConcurrentLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            SentraError::NotFound { .. } => StatusCode::NOT_FOUND,
            SentraError::ExternalDependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SentraError::ConfigurationError { .. } | SentraError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    user_id: Uuid,
    tenant_id: Option<Uuid>,
    /// Which provider verified the identity (e.g. `oidc:acme`).
    provider: String,
    device: DeviceInfo,
    ip_address: Option<String>,
    #[serde(default)]
    scopes: Vec<String>,
    /// Idempotency key for the login attempt; generated when absent.
    attempt_id: Option<Uuid>,
    #[serde(default)]
    claims_ext: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SessionCreationResponse {
    session: SessionSummary,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    security_warnings: Vec<String>,
    risk_score: f64,
}

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionCreationResponse>), ApiError> {
    let result = state
        .engine
        .create_session(CreateSessionInput {
            identity: VerifiedIdentity {
                user_id: req.user_id,
                provider: req.provider,
                ext: req.claims_ext,
            },
            tenant_id: req.tenant_id,
            device: req.device,
            ip_address: req.ip_address,
            scopes: req.scopes,
            attempt_id: req.attempt_id.unwrap_or_else(Uuid::new_v4),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreationResponse {
            session: SessionSummary::from(&result.session),
            access_token: result.tokens.access_token,
            refresh_token: result.tokens.refresh_token,
            expires_at: result.tokens.expires_at,
            refresh_expires_at: result.tokens.refresh_expires_at,
            security_warnings: result.security_warnings,
            risk_score: result.risk.score,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    generation: u32,
}

async fn refresh_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let pair = state.engine.refresh(&req.refresh_token).await?;
    if pair.session_id != id {
        return Err(SentraError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        }
        .into());
    }
    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_at: pair.expires_at,
        refresh_expires_at: pair.refresh_expires_at,
        generation: pair.generation,
    }))
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    valid: bool,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<TokenClaims>,
}

async fn validate_token(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let validation = state.engine.validate_token(&req.access_token).await?;
    let response = match validation {
        TokenValidation::Valid(claims) => ValidateResponse {
            valid: true,
            status: "valid",
            claims: Some(claims),
        },
        TokenValidation::Expired => ValidateResponse {
            valid: false,
            status: "expired",
            claims: None,
        },
        TokenValidation::InvalidSignature => ValidateResponse {
            valid: false,
            status: "invalid_signature",
            claims: None,
        },
        TokenValidation::Revoked => ValidateResponse {
            valid: false,
            status: "revoked",
            claims: None,
        },
        TokenValidation::Malformed { .. } => ValidateResponse {
            valid: false,
            status: "malformed",
            claims: None,
        },
    };
    Ok(Json(response))
}

async fn terminate_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.engine.terminate(id, TerminationReason::Logout).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TerminateAllQuery {
    exclude_device: Option<String>,
}

#[derive(Debug, Serialize)]
struct TerminateAllResponse {
    terminated: u64,
}

async fn terminate_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TerminateAllQuery>,
) -> Result<Json<TerminateAllResponse>, ApiError> {
    let terminated = state
        .engine
        .terminate_all_for_user(id, query.exclude_device.as_deref())
        .await?;
    Ok(Json(TerminateAllResponse { terminated }))
}

#[derive(Debug, Deserialize)]
struct ListSessionsQuery {
    tenant_id: Option<Uuid>,
}

async fn list_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = state.engine.list_sessions(id, query.tenant_id).await?;
    Ok(Json(sessions))
}
