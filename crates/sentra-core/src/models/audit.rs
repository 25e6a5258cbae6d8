//! Security audit event model.
//!
//! Structured records handed to the append-only audit sink on every
//! security-relevant state transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SecurityEventType {
    SessionCreated,
    SessionEvicted,
    SessionTerminated,
    SessionQuarantined,
    SessionReauthenticated,
    TokenRotated,
    RotationConflict,
    TokenRevoked,
    RiskFlagged,
    StepUpRequired,
    PolicyDenied,
    MembershipCascade,
    TrustGranted,
    TrustRevoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    pub session_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub details: serde_json::Value,
}
