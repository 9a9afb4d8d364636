//! Unit tests for guest session creation, expiry and extension.

use std::sync::Arc;

use chrono::TimeDelta;
use rstest::{fixture, rstest};
use serde_json::json;

use crate::session::{
    adapters::memory::InMemorySessionRepository,
    domain::{GuestSession, SessionMetadata, SessionDomainError, SessionToken, SessionTtl},
    services::{SessionStore, SessionStoreError},
};
use crate::test_support::ManualClock;

type TestStore = SessionStore<InMemorySessionRepository, ManualClock>;

struct Harness {
    store: TestStore,
    clock: Arc<ManualClock>,
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_2026());
    let ttl = SessionTtl::from_hours(24).expect("24h is a valid ttl");
    let store = SessionStore::new(
        Arc::new(InMemorySessionRepository::new()),
        Arc::clone(&clock),
        ttl,
    );
    Harness { store, clock }
}

#[rstest]
#[case(0)]
#[case(-3)]
fn non_positive_ttl_is_rejected(#[case] hours: i64) {
    let result = SessionTtl::from_hours(hours);
    assert_eq!(
        result,
        Err(SessionDomainError::NonPositiveTtl(hours * 3600))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fresh_session_is_not_expired(harness: Harness) {
    let metadata = SessionMetadata::new()
        .with_ip_address("203.0.113.9")
        .with_user_agent("Mozilla/5.0")
        .with_browser_info("language", json!("en-GB"));

    let session = harness
        .store
        .create_session(metadata.clone())
        .await
        .expect("session creation should succeed");

    assert!(!harness.store.is_expired(&session));
    assert_eq!(session.metadata(), &metadata);
    assert_eq!(
        session.expires_at() - session.created_at(),
        TimeDelta::hours(24)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn session_expires_once_ttl_elapses(harness: Harness) {
    let session = harness
        .store
        .create_session(SessionMetadata::new())
        .await
        .expect("session creation should succeed");

    harness.clock.advance(TimeDelta::hours(24) - TimeDelta::seconds(1));
    assert!(!harness.store.is_expired(&session));

    harness.clock.advance(TimeDelta::seconds(1));
    assert!(harness.store.is_expired(&session));

    let result = harness.store.validate(session.token()).await;
    assert!(matches!(result, Err(SessionStoreError::Expired { token, .. }) if token == session.token()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn touch_extends_expiry_from_now(harness: Harness) {
    let session = harness
        .store
        .create_session(SessionMetadata::new())
        .await
        .expect("session creation should succeed");

    harness.clock.advance(TimeDelta::hours(20));
    let touched = harness
        .store
        .touch(session.token())
        .await
        .expect("touch should succeed");
    assert!(!harness.store.is_expired(&touched));
    assert_eq!(touched.expires_at(), session.expires_at() + TimeDelta::hours(20));

    harness.clock.advance(TimeDelta::hours(10));
    let stored = harness
        .store
        .validate(session.token())
        .await
        .expect("extended session should still be valid");
    assert_eq!(stored.expires_at(), touched.expires_at());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_token_is_invalid(harness: Harness) {
    let token = SessionToken::new();
    let result = harness.store.touch(token).await;
    assert!(matches!(result, Err(SessionStoreError::Invalid(t)) if t == token));
}

#[rstest]
fn expiry_boundary_is_inclusive(harness: Harness) {
    let ttl = harness.store.ttl();
    let session = GuestSession::new(SessionMetadata::new(), ttl, &*harness.clock);
    assert!(!session.is_expired_at(session.expires_at() - TimeDelta::milliseconds(1)));
    assert!(session.is_expired_at(session.expires_at()));
}

#[rstest]
fn token_parsing_rejects_garbage() {
    let result: Result<SessionToken, _> = "not-a-uuid".parse();
    assert_eq!(
        result,
        Err(SessionDomainError::InvalidToken("not-a-uuid".to_owned()))
    );
}
