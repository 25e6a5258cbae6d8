//! Integration tests for the in-memory stores.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use sentra_core::Clock;
use sentra_core::SentraError;
use sentra_core::models::device::{DeviceInfo, Platform, TrustLevel};
use sentra_core::models::session::{
    CreateSession, SecurityLevel, SessionState, TerminationReason,
};
use sentra_core::repository::{DeviceRepository, RevocationStore, SessionRepository};
use sentra_store::{FrozenClock, MemoryDeviceRepository, MemoryRevocationStore, MemorySessionRepository};

fn clock() -> Arc<FrozenClock> {
    Arc::new(FrozenClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ))
}

fn session_input(user_id: Uuid, expires_at: chrono::DateTime<Utc>) -> CreateSession {
    CreateSession {
        user_id,
        tenant_id: Some(Uuid::new_v4()),
        device_id: "fp-1".into(),
        ip_address: None,
        security_level: SecurityLevel::Standard,
        expires_at,
        scopes: Vec::new(),
        attempt_id: None,
    }
}

#[tokio::test]
async fn generation_cas_allows_exactly_one_winner() {
    let clock = clock();
    let repo = MemorySessionRepository::new(clock.clone());
    let session = repo
        .create(session_input(Uuid::new_v4(), clock.now() + Duration::days(1)))
        .await
        .unwrap();

    assert_eq!(repo.advance_generation(session.id, 0).await.unwrap(), 1);

    // The stale expectation loses.
    let err = repo.advance_generation(session.id, 0).await.unwrap_err();
    assert!(matches!(err, SentraError::TokenRotationConflict));

    assert_eq!(repo.advance_generation(session.id, 1).await.unwrap(), 2);
}

#[tokio::test]
async fn terminate_is_idempotent_and_preserves_first_reason() {
    let clock = clock();
    let repo = MemorySessionRepository::new(clock.clone());
    let session = repo
        .create(session_input(Uuid::new_v4(), clock.now() + Duration::days(1)))
        .await
        .unwrap();

    let first = repo
        .terminate(session.id, TerminationReason::Logout, clock.now())
        .await
        .unwrap();
    assert_eq!(first.state, SessionState::Terminated);

    clock.advance(Duration::minutes(5));
    let second = repo
        .terminate(session.id, TerminationReason::Evicted, clock.now())
        .await
        .unwrap();
    assert_eq!(second.termination_reason, Some(TerminationReason::Logout));
    assert_eq!(second.terminated_at, first.terminated_at);
}

#[tokio::test]
async fn sweep_expires_only_overdue_active_sessions() {
    let clock = clock();
    let repo = MemorySessionRepository::new(clock.clone());
    let user = Uuid::new_v4();

    let short = repo
        .create(session_input(user, clock.now() + Duration::hours(1)))
        .await
        .unwrap();
    let long = repo
        .create(session_input(user, clock.now() + Duration::days(7)))
        .await
        .unwrap();
    repo.set_state(short.id, SessionState::Active).await.unwrap();
    repo.set_state(long.id, SessionState::Active).await.unwrap();

    clock.advance(Duration::hours(2));
    assert_eq!(repo.sweep_expired(clock.now()).await.unwrap(), 1);

    assert_eq!(
        repo.get(short.id).await.unwrap().state,
        SessionState::Expired
    );
    assert_eq!(repo.get(long.id).await.unwrap().state, SessionState::Active);
}

#[tokio::test]
async fn attempt_lookup_finds_the_created_session() {
    let clock = clock();
    let repo = MemorySessionRepository::new(clock.clone());
    let attempt = Uuid::new_v4();

    let mut input = session_input(Uuid::new_v4(), clock.now() + Duration::days(1));
    input.attempt_id = Some(attempt);
    let session = repo.create(input).await.unwrap();

    let found = repo.find_by_attempt(attempt).await.unwrap().unwrap();
    assert_eq!(found.id, session.id);
    assert!(repo.find_by_attempt(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn revocation_prune_drops_only_expired_entries() {
    let clock = clock();
    let store = MemoryRevocationStore::new();

    store.revoke_token("a", clock.now() + Duration::hours(1)).await.unwrap();
    store.revoke_token("b", clock.now() + Duration::days(1)).await.unwrap();

    clock.advance(Duration::hours(2));
    assert_eq!(store.prune(clock.now()).await.unwrap(), 1);
    assert!(!store.is_token_revoked("a").await.unwrap());
    assert!(store.is_token_revoked("b").await.unwrap());
}

#[tokio::test]
async fn min_generation_never_decreases() {
    let store = MemoryRevocationStore::new();
    let session_id = Uuid::new_v4();

    store.set_min_generation(session_id, 3).await.unwrap();
    store.set_min_generation(session_id, 1).await.unwrap();
    assert_eq!(store.min_generation(session_id).await.unwrap(), 3);
}

#[tokio::test]
async fn device_upsert_preserves_trust() {
    let store = MemoryDeviceRepository::new();
    let user = Uuid::new_v4();
    let info = DeviceInfo {
        fingerprint: "fp-1".into(),
        platform: Platform::Android,
        capabilities: Vec::new(),
        jailbroken: false,
        emulator: false,
    };
    let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    let device = store.upsert_seen(user, &info, t0).await.unwrap();
    assert_eq!(device.trust_level, TrustLevel::Basic);

    store.set_trust(user, "fp-1", TrustLevel::Trusted).await.unwrap();
    let device = store
        .upsert_seen(user, &info, t0 + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(device.trust_level, TrustLevel::Trusted);
    assert_eq!(device.last_seen_at, t0 + Duration::hours(1));
    assert_eq!(device.first_seen_at, t0);
}
