//! Session service — creation, validation, refresh, activity scoring,
//! quarantine, and termination orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use sentra_core::clock::Clock;
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::activity::{ActivityEvent, ActivityKind, GeoPoint};
use sentra_core::models::audit::{SecurityEvent, SecurityEventType, Severity};
use sentra_core::models::claims::{TokenClaims, VerifiedIdentity};
use sentra_core::models::device::{DeviceInfo, TrustLevel};
use sentra_core::models::risk::RiskAssessment;
use sentra_core::models::session::{
    CreateSession, SecurityLevel, Session, SessionState, SessionSummary, TerminationReason,
};
use sentra_core::models::token::TokenPair;
use sentra_core::repository::{
    ActivityRepository, AuditSink, DeviceRepository, GeoLookup, MembershipRepository,
    PolicyRepository, RevocationStore, SessionRepository,
};
use sentra_risk::{
    AnomalyDetector, DeviceTrustRegistry, EnforcementDecision, PolicyContext, PolicyEngine,
    PolicyTrigger, TenantAccessGuard,
};
use sentra_token::{TokenConfig, TokenService, TokenValidation};

use crate::config::SessionConfig;
use crate::events::{SessionEvents, SessionNotification};

/// Input for session creation.
#[derive(Debug, Clone)]
pub struct CreateSessionInput {
    /// Claim set already verified by the external identity provider.
    pub identity: VerifiedIdentity,
    pub tenant_id: Option<Uuid>,
    pub device: DeviceInfo,
    pub ip_address: Option<String>,
    pub scopes: Vec<String>,
    /// Idempotency key for this login attempt. Retrying with the same
    /// key after a timeout never creates a second session.
    pub attempt_id: Uuid,
}

/// Successful session creation.
#[derive(Debug, Clone)]
pub struct SessionCreationResult {
    pub session: Session,
    pub tokens: TokenPair,
    pub security_warnings: Vec<String>,
    pub risk: RiskAssessment,
}

/// Result of session-level validation.
///
/// `requires_reauth` is a session concept independent of token expiry:
/// an idle or quarantined session demands re-authentication even while
/// its access token is cryptographically fine.
#[derive(Debug, Clone)]
pub struct SessionValidation {
    pub session_id: Uuid,
    pub state: SessionState,
    pub valid: bool,
    pub requires_reauth: bool,
}

/// One activity observation to score.
#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub kind: ActivityKind,
    pub ip_address: Option<String>,
    /// Pre-resolved location; when absent the IP is resolved through
    /// the injected lookup.
    pub location: Option<GeoPoint>,
    /// Caller-supplied base contribution (provider fraud signals).
    pub risk_contribution: f64,
}

/// What happened to the session as a result of an activity event.
#[derive(Debug, Clone)]
pub enum ActivityOutcome {
    Allowed { assessment: RiskAssessment },
    Flagged { assessment: RiskAssessment },
    StepUpRequired { assessment: RiskAssessment },
    Quarantined { assessment: RiskAssessment },
    Denied { reason: String },
}

/// Orchestrates the session lifecycle across the token service,
/// device trust registry, anomaly detector, tenant guard, and policy
/// engine. All collaborators are injected; tests swap in fakes.
pub struct SessionService<S, R, D, M, P, A, U, G>
where
    S: SessionRepository,
    R: RevocationStore,
    D: DeviceRepository,
    M: MembershipRepository,
    P: PolicyRepository,
    A: ActivityRepository,
    U: AuditSink,
    G: GeoLookup,
{
    sessions: Arc<S>,
    revocations: Arc<R>,
    memberships: Arc<M>,
    policies: Arc<P>,
    activity: Arc<A>,
    audit: Arc<U>,
    tokens: TokenService<S, R>,
    devices: DeviceTrustRegistry<D>,
    guard: TenantAccessGuard<M>,
    detector: AnomalyDetector<G>,
    engine: PolicyEngine,
    events: SessionEvents,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl<S, R, D, M, P, A, U, G> SessionService<S, R, D, M, P, A, U, G>
where
    S: SessionRepository,
    R: RevocationStore,
    D: DeviceRepository,
    M: MembershipRepository,
    P: PolicyRepository,
    A: ActivityRepository,
    U: AuditSink,
    G: GeoLookup,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<S>,
        revocations: Arc<R>,
        devices: Arc<D>,
        memberships: Arc<M>,
        policies: Arc<P>,
        activity: Arc<A>,
        audit: Arc<U>,
        geo: Arc<G>,
        token_config: TokenConfig,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> SentraResult<Self> {
        let tokens = TokenService::new(
            sessions.clone(),
            revocations.clone(),
            token_config,
            clock.clone(),
        )?;
        let events = SessionEvents::new(config.event_channel_capacity);

        Ok(Self {
            tokens,
            devices: DeviceTrustRegistry::new(devices, clock.clone()),
            guard: TenantAccessGuard::new(memberships.clone()),
            detector: AnomalyDetector::new(geo),
            engine: PolicyEngine::new(),
            sessions,
            revocations,
            memberships,
            policies,
            activity,
            audit,
            events,
            clock,
            config,
        })
    }

    pub fn tokens(&self) -> &TokenService<S, R> {
        &self.tokens
    }

    pub fn device_trust(&self) -> &DeviceTrustRegistry<D> {
        &self.devices
    }

    /// Subscribe to session state-transition notifications.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionNotification> {
        self.events.subscribe()
    }

    /// Create a session for a verified identity.
    ///
    /// Runs the full gauntlet: tenant gate, device evaluation, policy
    /// enforcement, token issuance. Nothing is committed until every
    /// check passes; a failed token issuance rolls the record back to
    /// terminated with no tokens outstanding.
    pub async fn create_session(
        &self,
        input: CreateSessionInput,
    ) -> SentraResult<SessionCreationResult> {
        let now = self.clock.now();
        let user_id = input.identity.user_id;

        // 1. Idempotency: a retried login attempt reuses its session.
        if let Some(existing) = self.sessions.find_by_attempt(input.attempt_id).await? {
            match existing.state {
                SessionState::Active => return self.reissue_for_attempt(existing).await,
                SessionState::Pending => {
                    // A previous attempt died between create and issue.
                    self.sessions
                        .terminate(existing.id, TerminationReason::CreationFailed, now)
                        .await?;
                }
                _ => {}
            }
        }

        // 2. Tenant gate.
        if let Some(tenant_id) = input.tenant_id {
            self.guard.check_access(user_id, tenant_id).await?;
        }

        let policy = self.policies.policy_for(input.tenant_id).await?;

        // 3. Device evaluation (attestation signals come from the caller).
        let device_eval = self.devices.evaluate(user_id, &input.device).await?;

        // 4. Resolve location; unknown on timeout or outage.
        let (location, anonymizing, mut security_warnings) =
            self.resolve_geo(input.ip_address.as_deref()).await;

        // 5. Initial risk: no history yet, so the device factors and
        //    network reputation carry the score.
        let probe = ActivityEvent {
            session_id: Uuid::nil(),
            timestamp: now,
            kind: ActivityKind::Login,
            location: location.clone(),
            ip_address: input.ip_address.clone(),
            risk_contribution: 0.0,
            anonymizing_network: anonymizing,
        };
        let risk = self
            .detector
            .score(&[], &probe, &device_eval.risk_factors);

        // 6. Concurrent-session limit, evicting the oldest if the
        //    tenant's policy allows it.
        let mut active = self
            .sessions
            .list_active_for_user(user_id, input.tenant_id)
            .await?;
        if active.len() as u32 >= policy.max_concurrent_sessions && policy.evict_oldest_on_limit {
            while !active.is_empty() && active.len() as u32 >= policy.max_concurrent_sessions {
                let oldest = active.remove(0);
                self.sessions
                    .terminate(oldest.id, TerminationReason::Evicted, now)
                    .await?;
                self.revocations.revoke_session(oldest.id).await?;
                self.record_audit(
                    SecurityEventType::SessionEvicted,
                    Severity::Info,
                    Some(oldest.id),
                    Some(user_id),
                    oldest.tenant_id,
                    json!({ "evicted_for_attempt": input.attempt_id }),
                )
                .await;
                self.publish(&oldest, SessionState::Terminated);
            }
        }

        // 7. Policy enforcement. First failing check decides.
        let country = location.as_ref().map(|l| l.country.as_str());
        let decision = self.engine.evaluate(&PolicyContext {
            policy: &policy,
            country,
            device_trust: device_eval.effective_trust,
            active_sessions: active.len() as u32,
            risk_score: risk.score,
        });
        match &decision {
            EnforcementDecision::Allow => {}
            EnforcementDecision::Warn(triggers) => {
                security_warnings.extend(triggers.iter().map(PolicyTrigger::reason));
            }
            EnforcementDecision::StepUpAuth(trigger) => {
                security_warnings.push(trigger.reason());
            }
            EnforcementDecision::Terminate(trigger) => {
                return Err(self
                    .deny_creation(trigger.clone(), user_id, input.tenant_id, &risk)
                    .await);
            }
        }

        let step_up_pending = matches!(decision, EnforcementDecision::StepUpAuth(_));
        let security_level = if step_up_pending {
            SecurityLevel::Restricted
        } else if device_eval.effective_trust >= TrustLevel::Trusted
            && risk.score < policy.risk_flag_threshold
        {
            SecurityLevel::Elevated
        } else {
            SecurityLevel::Standard
        };

        // 8. Commit the record and issue the credential pair.
        let mut session = self
            .sessions
            .create(CreateSession {
                user_id,
                tenant_id: input.tenant_id,
                device_id: input.device.fingerprint.clone(),
                ip_address: input.ip_address.clone(),
                security_level,
                expires_at: now + Duration::seconds(policy.session_lifetime_secs as i64),
                scopes: input.scopes.clone(),
                attempt_id: Some(input.attempt_id),
            })
            .await?;

        let pair = match self.tokens.issue(&session, &session.scopes, &input.identity.ext) {
            Ok(pair) => pair,
            Err(e) => {
                // Roll back: no session without tokens.
                self.sessions
                    .terminate(session.id, TerminationReason::CreationFailed, now)
                    .await?;
                return Err(e);
            }
        };

        self.sessions
            .set_state(session.id, SessionState::Active)
            .await?;
        session.state = SessionState::Active;

        let mut login_event = probe;
        login_event.session_id = session.id;
        self.activity.append(login_event).await?;

        self.record_audit(
            SecurityEventType::SessionCreated,
            Severity::Info,
            Some(session.id),
            Some(user_id),
            session.tenant_id,
            json!({
                "device_id": session.device_id,
                "ip_address": session.ip_address,
                "risk_score": risk.score,
                "security_level": session.security_level,
                "warnings": &security_warnings,
                "provider": input.identity.provider,
            }),
        )
        .await;
        self.publish(&session, SessionState::Active);

        tracing::info!(
            session_id = %session.id,
            user_id = %user_id,
            risk_score = risk.score,
            "session created"
        );

        Ok(SessionCreationResult {
            session,
            tokens: pair,
            security_warnings,
            risk,
        })
    }

    /// Session-level validity check.
    pub async fn validate(&self, session_id: Uuid) -> SentraResult<SessionValidation> {
        let session = self.sessions.get(session_id).await?;
        let now = self.clock.now();
        let policy = self.policies.policy_for(session.tenant_id).await?;

        let mut state = session.state;
        if state == SessionState::Active && session.expires_at <= now {
            self.sessions
                .set_state(session_id, SessionState::Expired)
                .await?;
            state = SessionState::Expired;
        }

        let idle_exceeded = state == SessionState::Active
            && now - session.last_accessed_at
                > Duration::seconds(policy.idle_timeout_secs as i64);
        let requires_reauth = idle_exceeded
            || state == SessionState::Quarantined
            || session.security_level == SecurityLevel::Restricted;

        Ok(SessionValidation {
            session_id,
            state,
            valid: state == SessionState::Active && !requires_reauth,
            requires_reauth,
        })
    }

    /// Validate an access token on its own (no tenant scope).
    pub async fn validate_token(&self, raw: &str) -> SentraResult<TokenValidation> {
        self.tokens.validate_access(raw).await
    }

    /// Validate an access token against a tenant-scoped operation.
    ///
    /// A token minted for tenant A never authorizes work in tenant B,
    /// active membership in B notwithstanding.
    pub async fn authorize(&self, raw: &str, tenant_id: Uuid) -> SentraResult<TokenClaims> {
        let claims = match self.tokens.validate_access(raw).await? {
            TokenValidation::Valid(claims) => claims,
            TokenValidation::Expired => return Err(SentraError::Expired),
            TokenValidation::InvalidSignature => return Err(SentraError::InvalidSignature),
            TokenValidation::Revoked => return Err(SentraError::Revoked),
            TokenValidation::Malformed { reason } => {
                return Err(SentraError::Malformed { reason });
            }
        };
        if claims.tenant_id != Some(tenant_id) {
            return Err(SentraError::TenantMismatch);
        }
        let session = self.sessions.get(claims.session_id).await?;
        if session.state != SessionState::Active {
            return Err(SentraError::Revoked);
        }
        Ok(claims)
    }

    /// Rotate a refresh token and extend the session's activity mark.
    ///
    /// Re-checks tenant membership first: a deactivated membership can
    /// never refresh, and the cascade terminates the session on the
    /// spot.
    pub async fn refresh(&self, raw: &str) -> SentraResult<TokenPair> {
        let now = self.clock.now();
        let claims = self.tokens.decode_refresh(raw).await?;

        let session = match self.sessions.get(claims.session_id).await {
            Ok(session) => session,
            Err(SentraError::NotFound { .. }) => return Err(SentraError::Revoked),
            Err(e) => return Err(e),
        };
        if session.state != SessionState::Active {
            return Err(SentraError::Revoked);
        }

        if let Some(tenant_id) = session.tenant_id {
            if !self.memberships.is_active(session.user_id, tenant_id).await? {
                self.sessions
                    .terminate(session.id, TerminationReason::MembershipDeactivated, now)
                    .await?;
                self.revocations.revoke_session(session.id).await?;
                self.record_audit(
                    SecurityEventType::MembershipCascade,
                    Severity::Warning,
                    Some(session.id),
                    Some(session.user_id),
                    Some(tenant_id),
                    json!({ "trigger": "refresh" }),
                )
                .await;
                self.publish(&session, SessionState::Terminated);
                return Err(SentraError::TenantInactive);
            }
        }

        let pair = match self.tokens.rotate(raw).await {
            Ok(pair) => pair,
            Err(SentraError::TokenRotationConflict) => {
                // A stale token lost the race. Loud by design: this is
                // the replay signature.
                self.record_audit(
                    SecurityEventType::RotationConflict,
                    Severity::Warning,
                    Some(session.id),
                    Some(session.user_id),
                    session.tenant_id,
                    json!({ "presented_generation": claims.generation }),
                )
                .await;
                return Err(SentraError::TokenRotationConflict);
            }
            Err(e) => return Err(e),
        };

        self.sessions.touch(session.id, now).await?;
        self.activity
            .append(ActivityEvent {
                session_id: session.id,
                timestamp: now,
                kind: ActivityKind::TokenRefresh,
                location: None,
                ip_address: None,
                risk_contribution: 0.0,
                anonymizing_network: false,
            })
            .await?;
        self.record_audit(
            SecurityEventType::TokenRotated,
            Severity::Info,
            Some(session.id),
            Some(session.user_id),
            session.tenant_id,
            json!({ "generation": pair.generation }),
        )
        .await;

        Ok(pair)
    }

    /// Score an activity observation and enforce the outcome.
    pub async fn record_activity(
        &self,
        session_id: Uuid,
        input: ActivityInput,
    ) -> SentraResult<ActivityOutcome> {
        let now = self.clock.now();
        let session = self.sessions.get(session_id).await?;
        match session.state {
            SessionState::Active => {}
            SessionState::Quarantined => return Err(SentraError::RiskQuarantine),
            _ => return Err(SentraError::Revoked),
        }

        let policy = self.policies.policy_for(session.tenant_id).await?;

        let (location, anonymizing) = match input.location {
            Some(location) => (Some(location), false),
            None => {
                let (location, anonymizing, _) =
                    self.resolve_geo(input.ip_address.as_deref()).await;
                (location, anonymizing)
            }
        };

        let event = ActivityEvent {
            session_id,
            timestamp: now,
            kind: input.kind,
            location,
            ip_address: input.ip_address,
            risk_contribution: input.risk_contribution,
            anonymizing_network: anonymizing,
        };

        let history = self.activity.for_session(session_id).await?;
        let assessment = self.detector.score(&history, &event, &[]);

        self.activity.append(event.clone()).await?;
        self.sessions.touch(session_id, now).await?;

        let device_trust = self
            .devices
            .stored_trust(session.user_id, &session.device_id)
            .await?;
        let active = self
            .sessions
            .list_active_for_user(session.user_id, session.tenant_id)
            .await?;

        let decision = self.engine.evaluate(&PolicyContext {
            policy: &policy,
            country: event.location.as_ref().map(|l| l.country.as_str()),
            device_trust,
            // This session is already among the active ones.
            active_sessions: (active.len() as u32).saturating_sub(1),
            risk_score: assessment.score,
        });

        match decision {
            EnforcementDecision::Allow => Ok(ActivityOutcome::Allowed { assessment }),
            EnforcementDecision::Warn(_) => {
                self.record_audit(
                    SecurityEventType::RiskFlagged,
                    Severity::Warning,
                    Some(session.id),
                    Some(session.user_id),
                    session.tenant_id,
                    json!({ "score": assessment.score, "factors": &assessment.factors }),
                )
                .await;
                Ok(ActivityOutcome::Flagged { assessment })
            }
            EnforcementDecision::StepUpAuth(trigger) => {
                self.sessions
                    .set_security_level(session.id, SecurityLevel::Restricted)
                    .await?;
                self.record_audit(
                    SecurityEventType::StepUpRequired,
                    Severity::Warning,
                    Some(session.id),
                    Some(session.user_id),
                    session.tenant_id,
                    json!({ "score": assessment.score, "reason": trigger.reason() }),
                )
                .await;
                Ok(ActivityOutcome::StepUpRequired { assessment })
            }
            EnforcementDecision::Terminate(PolicyTrigger::RiskQuarantine { score }) => {
                self.sessions
                    .set_state(session.id, SessionState::Quarantined)
                    .await?;
                // Everything issued so far dies; only tokens minted
                // after re-authentication (next generation) validate.
                self.revocations
                    .set_min_generation(session.id, session.generation + 1)
                    .await?;
                self.record_audit(
                    SecurityEventType::SessionQuarantined,
                    Severity::Critical,
                    Some(session.id),
                    Some(session.user_id),
                    session.tenant_id,
                    json!({ "score": score, "factors": &assessment.factors }),
                )
                .await;
                self.publish(&session, SessionState::Quarantined);
                Ok(ActivityOutcome::Quarantined { assessment })
            }
            EnforcementDecision::Terminate(trigger) => {
                let reason = trigger.reason();
                self.sessions
                    .terminate(session.id, TerminationReason::PolicyViolation, now)
                    .await?;
                self.revocations.revoke_session(session.id).await?;
                self.record_audit(
                    SecurityEventType::PolicyDenied,
                    Severity::Critical,
                    Some(session.id),
                    Some(session.user_id),
                    session.tenant_id,
                    json!({ "reason": &reason }),
                )
                .await;
                self.publish(&session, SessionState::Terminated);
                Ok(ActivityOutcome::Denied { reason })
            }
        }
    }

    /// The only way back from `Quarantined` (and out of a step-up
    /// hold): a fresh verified claim set for the same user.
    pub async fn reauthenticate(
        &self,
        session_id: Uuid,
        identity: &VerifiedIdentity,
    ) -> SentraResult<TokenPair> {
        let now = self.clock.now();
        let session = self.sessions.get(session_id).await?;

        if identity.user_id != session.user_id {
            return Err(SentraError::PolicyViolation {
                reason: "re-authentication identity does not match session user".into(),
            });
        }
        let held = session.state == SessionState::Quarantined
            || (session.state == SessionState::Active
                && session.security_level == SecurityLevel::Restricted);
        if !held {
            return Err(SentraError::PolicyViolation {
                reason: "session is not awaiting re-authentication".into(),
            });
        }

        if let Some(tenant_id) = session.tenant_id {
            self.guard.check_access(session.user_id, tenant_id).await?;
        }

        // Bump the generation so nothing issued before the hold can
        // ever validate again.
        let generation = self
            .sessions
            .advance_generation(session.id, session.generation)
            .await?;
        self.revocations
            .set_min_generation(session.id, generation)
            .await?;

        self.sessions
            .set_state(session.id, SessionState::Active)
            .await?;
        self.sessions
            .set_security_level(session.id, SecurityLevel::Standard)
            .await?;
        self.sessions.touch(session.id, now).await?;

        let mut refreshed = session.clone();
        refreshed.state = SessionState::Active;
        refreshed.security_level = SecurityLevel::Standard;
        refreshed.generation = generation;
        let pair = self
            .tokens
            .issue(&refreshed, &refreshed.scopes, &identity.ext)?;

        self.activity
            .append(ActivityEvent {
                session_id: session.id,
                timestamp: now,
                kind: ActivityKind::StepUpCompleted,
                location: None,
                ip_address: None,
                risk_contribution: 0.0,
                anonymizing_network: false,
            })
            .await?;
        self.record_audit(
            SecurityEventType::SessionReauthenticated,
            Severity::Info,
            Some(session.id),
            Some(session.user_id),
            session.tenant_id,
            json!({ "provider": &identity.provider, "generation": generation }),
        )
        .await;
        self.publish(&refreshed, SessionState::Active);

        Ok(pair)
    }

    /// Irreversibly terminate a session and revoke every outstanding
    /// token it ever issued. Idempotent.
    pub async fn terminate(
        &self,
        session_id: Uuid,
        reason: TerminationReason,
    ) -> SentraResult<Session> {
        let now = self.clock.now();
        let session = self.sessions.terminate(session_id, reason, now).await?;
        self.revocations.revoke_session(session_id).await?;
        self.record_audit(
            SecurityEventType::SessionTerminated,
            Severity::Info,
            Some(session_id),
            Some(session.user_id),
            session.tenant_id,
            json!({ "reason": reason }),
        )
        .await;
        self.publish(&session, SessionState::Terminated);
        Ok(session)
    }

    /// "Log out everywhere", optionally sparing the calling device.
    pub async fn terminate_all_for_user(
        &self,
        user_id: Uuid,
        exclude_device: Option<&str>,
    ) -> SentraResult<u64> {
        let now = self.clock.now();
        let terminated = self
            .sessions
            .terminate_all_for_user(user_id, exclude_device, TerminationReason::LogoutEverywhere, now)
            .await?;

        for session in &terminated {
            self.revocations.revoke_session(session.id).await?;
            self.record_audit(
                SecurityEventType::SessionTerminated,
                Severity::Info,
                Some(session.id),
                Some(user_id),
                session.tenant_id,
                json!({ "reason": TerminationReason::LogoutEverywhere }),
            )
            .await;
            self.publish(session, SessionState::Terminated);
        }
        Ok(terminated.len() as u64)
    }

    /// Active sessions for the multi-device management surface.
    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> SentraResult<Vec<SessionSummary>> {
        let sessions = self
            .sessions
            .list_active_for_user(user_id, tenant_id)
            .await?;
        Ok(sessions.iter().map(SessionSummary::from).collect())
    }

    /// Switch tenants: gate the new tenant, create a brand-new session
    /// scoped to it, then terminate the old one. The old session's
    /// tenant is never mutated underneath its outstanding tokens.
    pub async fn switch_tenant(
        &self,
        session_id: Uuid,
        new_tenant: Uuid,
        attempt_id: Uuid,
    ) -> SentraResult<SessionCreationResult> {
        let old = self.sessions.get(session_id).await?;
        if old.state != SessionState::Active {
            return Err(SentraError::Revoked);
        }

        self.guard.check_access(old.user_id, new_tenant).await?;

        let device = self
            .devices
            .stored(old.user_id, &old.device_id)
            .await?
            .ok_or_else(|| SentraError::NotFound {
                entity: "device".into(),
                id: old.device_id.clone(),
            })?;

        let result = self
            .create_session(CreateSessionInput {
                identity: VerifiedIdentity {
                    user_id: old.user_id,
                    provider: "tenant-switch".into(),
                    ext: BTreeMap::new(),
                },
                tenant_id: Some(new_tenant),
                device: DeviceInfo {
                    fingerprint: device.device_id,
                    platform: device.platform,
                    capabilities: device.capabilities,
                    jailbroken: false,
                    emulator: false,
                },
                ip_address: old.ip_address.clone(),
                scopes: old.scopes.clone(),
                attempt_id,
            })
            .await?;

        self.terminate(old.id, TerminationReason::TenantSwitch).await?;
        Ok(result)
    }

    /// Cascade a membership deactivation into session termination.
    /// Returns how many sessions were torn down.
    pub async fn enforce_membership(&self, user_id: Uuid, tenant_id: Uuid) -> SentraResult<u64> {
        if self.memberships.is_active(user_id, tenant_id).await? {
            return Ok(0);
        }
        let now = self.clock.now();
        let sessions = self
            .sessions
            .list_active_for_user(user_id, Some(tenant_id))
            .await?;
        let mut count = 0;
        for session in sessions {
            self.sessions
                .terminate(session.id, TerminationReason::MembershipDeactivated, now)
                .await?;
            self.revocations.revoke_session(session.id).await?;
            self.record_audit(
                SecurityEventType::MembershipCascade,
                Severity::Warning,
                Some(session.id),
                Some(user_id),
                Some(tenant_id),
                json!({ "trigger": "membership-deactivated" }),
            )
            .await;
            self.publish(&session, SessionState::Terminated);
            count += 1;
        }
        Ok(count)
    }

    /// Expiry housekeeping: flip overdue sessions to `Expired` and
    /// drop revocation entries for tokens that have aged out.
    pub async fn sweep(&self) -> SentraResult<(u64, u64)> {
        let now = self.clock.now();
        let expired = self.sessions.sweep_expired(now).await?;
        let pruned = self.revocations.prune(now).await?;
        if expired > 0 {
            tracing::debug!(expired, pruned, "session sweep");
        }
        Ok((expired, pruned))
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Reissue tokens for an idempotent replay of a login attempt.
    ///
    /// The generation advances, so whatever pair the lost response
    /// carried is dead; there is still exactly one live pair.
    async fn reissue_for_attempt(&self, session: Session) -> SentraResult<SessionCreationResult> {
        let generation = self
            .sessions
            .advance_generation(session.id, session.generation)
            .await?;
        let mut session = session;
        session.generation = generation;

        let pair = self
            .tokens
            .issue(&session, &session.scopes, &BTreeMap::new())?;

        tracing::info!(session_id = %session.id, "login attempt replayed; tokens reissued");
        Ok(SessionCreationResult {
            risk: RiskAssessment::none(self.clock.now()),
            security_warnings: vec!["login attempt replayed; previous tokens invalidated".into()],
            session,
            tokens: pair,
        })
    }

    async fn deny_creation(
        &self,
        trigger: PolicyTrigger,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
        risk: &RiskAssessment,
    ) -> SentraError {
        let reason = trigger.reason();
        self.record_audit(
            SecurityEventType::PolicyDenied,
            Severity::Warning,
            None,
            Some(user_id),
            tenant_id,
            json!({ "reason": reason, "risk_score": risk.score }),
        )
        .await;

        match trigger {
            PolicyTrigger::DeviceTrustRequired => SentraError::DeviceNotTrusted,
            PolicyTrigger::ConcurrentLimit { limit } => {
                SentraError::ConcurrentLimitExceeded { limit }
            }
            PolicyTrigger::RiskQuarantine { .. } => SentraError::RiskQuarantine,
            other => SentraError::PolicyViolation {
                reason: other.reason(),
            },
        }
    }

    /// Resolve location and network reputation for an IP, failing
    /// closed to "unknown" on timeout or outage.
    async fn resolve_geo(
        &self,
        ip: Option<&str>,
    ) -> (Option<GeoPoint>, bool, Vec<String>) {
        let Some(ip) = ip else {
            return (None, false, Vec::new());
        };
        let budget = StdDuration::from_millis(self.config.geo_lookup_timeout_ms);
        match tokio::time::timeout(budget, self.detector.resolve(ip)).await {
            Ok(Ok(Some(intel))) => (Some(intel.point), intel.anonymizing_network, Vec::new()),
            Ok(Ok(None)) => (None, false, Vec::new()),
            Ok(Err(e)) => {
                tracing::warn!(ip, error = %e, "geolocation lookup failed");
                (None, false, vec!["location could not be verified".into()])
            }
            Err(_) => {
                tracing::warn!(ip, "geolocation lookup timed out");
                (None, false, vec!["location could not be verified".into()])
            }
        }
    }

    async fn record_audit(
        &self,
        event_type: SecurityEventType,
        severity: Severity,
        session_id: Option<Uuid>,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        details: serde_json::Value,
    ) {
        let event = SecurityEvent {
            event_type,
            session_id,
            user_id,
            tenant_id,
            timestamp: self.clock.now(),
            severity,
            details,
        };
        if let Err(e) = self.audit.record(event).await {
            tracing::warn!(?event_type, error = %e, "audit sink rejected event");
        }
    }

    fn publish(&self, session: &Session, state: SessionState) {
        self.events.publish(SessionNotification {
            session_id: session.id,
            user_id: session.user_id,
            tenant_id: session.tenant_id,
            state,
            at: self.clock.now(),
        });
    }
}
