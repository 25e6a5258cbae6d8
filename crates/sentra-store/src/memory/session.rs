//! In-memory implementation of [`SessionRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::clock::Clock;
use sentra_core::error::{SentraError, SentraResult};
use sentra_core::models::session::{
    CreateSession, SecurityLevel, Session, SessionState, TerminationReason,
};
use sentra_core::repository::SessionRepository;

pub struct MemorySessionRepository {
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    by_attempt: RwLock<HashMap<Uuid, Uuid>>,
}

impl MemorySessionRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            sessions: RwLock::new(HashMap::new()),
            by_attempt: RwLock::new(HashMap::new()),
        }
    }

    fn not_found(id: Uuid) -> SentraError {
        SentraError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        }
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn create(&self, input: CreateSession) -> SentraResult<Session> {
        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            tenant_id: input.tenant_id,
            device_id: input.device_id,
            ip_address: input.ip_address,
            state: SessionState::Pending,
            security_level: input.security_level,
            generation: 0,
            created_at: now,
            last_accessed_at: now,
            expires_at: input.expires_at,
            terminated_at: None,
            termination_reason: None,
            scopes: input.scopes,
            attempt_id: input.attempt_id,
        };

        if let Some(attempt_id) = input.attempt_id {
            self.by_attempt.write().insert(attempt_id, session.id);
        }
        self.sessions.write().insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> SentraResult<Session> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn find_by_attempt(&self, attempt_id: Uuid) -> SentraResult<Option<Session>> {
        let id = match self.by_attempt.read().get(&attempt_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.sessions.read().get(&id).cloned())
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> SentraResult<Vec<Session>> {
        let sessions = self.sessions.read();
        let mut out: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id && s.state == SessionState::Active)
            .filter(|s| tenant_id.is_none() || s.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.created_at);
        Ok(out)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> SentraResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        session.last_accessed_at = at;
        Ok(())
    }

    async fn set_state(&self, id: Uuid, state: SessionState) -> SentraResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        session.state = state;
        Ok(())
    }

    async fn set_security_level(&self, id: Uuid, level: SecurityLevel) -> SentraResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        session.security_level = level;
        Ok(())
    }

    async fn advance_generation(&self, id: Uuid, expected: u32) -> SentraResult<u32> {
        // Single write lock makes the compare-and-swap atomic: of two
        // concurrent rotations, the second observes the incremented
        // counter and loses.
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if session.generation != expected {
            return Err(SentraError::TokenRotationConflict);
        }
        session.generation += 1;
        Ok(session.generation)
    }

    async fn terminate(
        &self,
        id: Uuid,
        reason: TerminationReason,
        at: DateTime<Utc>,
    ) -> SentraResult<Session> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        if !session.state.is_terminal() {
            session.state = SessionState::Terminated;
            session.terminated_at = Some(at);
            session.termination_reason = Some(reason);
        }
        Ok(session.clone())
    }

    async fn terminate_all_for_user(
        &self,
        user_id: Uuid,
        exclude_device: Option<&str>,
        reason: TerminationReason,
        at: DateTime<Utc>,
    ) -> SentraResult<Vec<Session>> {
        let mut sessions = self.sessions.write();
        let mut terminated = Vec::new();
        for session in sessions.values_mut() {
            if session.user_id != user_id || session.state.is_terminal() {
                continue;
            }
            if exclude_device.is_some_and(|d| session.device_id == d) {
                continue;
            }
            session.state = SessionState::Terminated;
            session.terminated_at = Some(at);
            session.termination_reason = Some(reason);
            terminated.push(session.clone());
        }
        Ok(terminated)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> SentraResult<u64> {
        let mut sessions = self.sessions.write();
        let mut swept = 0;
        for session in sessions.values_mut() {
            if session.state == SessionState::Active && session.expires_at <= now {
                session.state = SessionState::Expired;
                swept += 1;
            }
        }
        Ok(swept)
    }
}
