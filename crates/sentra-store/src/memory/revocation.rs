//! In-memory implementation of [`RevocationStore`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::error::SentraResult;
use sentra_core::repository::RevocationStore;

#[derive(Default)]
pub struct MemoryRevocationStore {
    /// jti hash -> token expiry (entries past expiry are prunable).
    tokens: RwLock<HashMap<String, DateTime<Utc>>>,
    sessions: RwLock<HashSet<Uuid>>,
    min_generations: RwLock<HashMap<Uuid, u32>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevocationStore for MemoryRevocationStore {
    async fn revoke_token(&self, jti_hash: &str, expires_at: DateTime<Utc>) -> SentraResult<()> {
        self.tokens.write().insert(jti_hash.to_string(), expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti_hash: &str) -> SentraResult<bool> {
        Ok(self.tokens.read().contains_key(jti_hash))
    }

    async fn revoke_session(&self, session_id: Uuid) -> SentraResult<()> {
        self.sessions.write().insert(session_id);
        Ok(())
    }

    async fn is_session_revoked(&self, session_id: Uuid) -> SentraResult<bool> {
        Ok(self.sessions.read().contains(&session_id))
    }

    async fn set_min_generation(&self, session_id: Uuid, min: u32) -> SentraResult<()> {
        let mut gens = self.min_generations.write();
        let entry = gens.entry(session_id).or_insert(0);
        // Never lowered: a later quarantine cannot resurrect older tokens.
        if min > *entry {
            *entry = min;
        }
        Ok(())
    }

    async fn min_generation(&self, session_id: Uuid) -> SentraResult<u32> {
        Ok(self
            .min_generations
            .read()
            .get(&session_id)
            .copied()
            .unwrap_or(0))
    }

    async fn prune(&self, now: DateTime<Utc>) -> SentraResult<u64> {
        let mut tokens = self.tokens.write();
        let before = tokens.len();
        tokens.retain(|_, expires_at| *expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}
