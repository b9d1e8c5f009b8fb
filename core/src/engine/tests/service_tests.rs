//! Engine pipeline tests against the in-memory backend

use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use super::mocks::{standard_rig, start_engine, test_settings};
use crate::domain::entities::AuthStatus;
use crate::engine::EngineEvent;

#[tokio::test]
async fn accepted_credential_is_served_from_cache() {
    let rig = standard_rig(test_settings()).await;

    let first = rig
        .engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(first.status, AuthStatus::Authenticated);
    assert_eq!(rig.backend.call_count(), 1);

    // second call must not reach the backend
    let second = rig
        .engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(second.status, AuthStatus::Authenticated);
    assert_eq!(rig.backend.call_count(), 1);

    assert!(rig.engine.is_credential_cached("test.com", "jeff"));
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn realm_and_account_lookups_are_case_insensitive() {
    let rig = standard_rig(test_settings()).await;

    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    let cached = rig
        .engine
        .authenticate("TEST.COM", "Jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(cached.status, AuthStatus::Authenticated);
    assert_eq!(rig.backend.call_count(), 1);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn repeated_bad_password_is_served_from_negative_cache() {
    let rig = standard_rig(test_settings()).await;

    let first = rig
        .engine
        .authenticate("test.com", "jeff", "wrong")
        .await
        .unwrap();
    assert_eq!(first.status, AuthStatus::BadPassword);
    assert_eq!(rig.backend.call_count(), 1);

    let second = rig
        .engine
        .authenticate("test.com", "jeff", "wrong")
        .await
        .unwrap();
    assert_eq!(second.status, AuthStatus::BadPassword);
    // no second backend call, but the failure still counted
    assert_eq!(rig.backend.call_count(), 1);
    let snapshot = rig.engine.lockout_snapshot("test.com", "jeff").unwrap();
    assert_eq!(snapshot.fail_count, 2);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn a_new_bad_password_reaches_the_backend() {
    let rig = standard_rig(test_settings()).await;

    rig.engine
        .authenticate("test.com", "jeff", "wrong-one")
        .await
        .unwrap();
    rig.engine
        .authenticate("test.com", "jeff", "wrong-two")
        .await
        .unwrap();
    assert_eq!(rig.backend.call_count(), 2);

    let snapshot = rig.engine.lockout_snapshot("test.com", "jeff").unwrap();
    assert_eq!(snapshot.fail_count, 2);
    assert_eq!(snapshot.bad_password_count(), 2);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn wrong_password_does_not_evict_cached_credential() {
    let rig = standard_rig(test_settings()).await;

    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    let wrong = rig
        .engine
        .authenticate("test.com", "jeff", "nope")
        .await
        .unwrap();
    assert_eq!(wrong.status, AuthStatus::BadPassword);

    // the accepted credential is still cached alongside the negative entry
    assert!(rig.engine.is_credential_cached("test.com", "jeff"));
    let ok = rig
        .engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(ok.status, AuthStatus::Authenticated);
    assert_eq!(rig.backend.call_count(), 2);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn unknown_realm_is_rejected_without_caching() {
    let rig = standard_rig(test_settings()).await;

    let result = rig
        .engine
        .authenticate("nowhere.example", "jeff", "foobar")
        .await
        .unwrap();
    assert_eq!(result.status, AuthStatus::BadRealm);
    assert_eq!(rig.backend.call_count(), 0);
    assert!(!rig.engine.is_credential_cached("nowhere.example", "jeff"));
    assert!(rig
        .engine
        .lockout_snapshot("nowhere.example", "jeff")
        .is_none());
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn empty_password_short_circuits() {
    let rig = standard_rig(test_settings()).await;

    let result = rig
        .engine
        .authenticate("test.com", "jeff", "")
        .await
        .unwrap();
    assert_eq!(result.status, AuthStatus::BadPassword);
    assert_eq!(rig.backend.call_count(), 0);
    assert!(!rig.engine.is_credential_cached("test.com", "jeff"));
    assert!(rig.engine.lockout_snapshot("test.com", "jeff").is_none());
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn disabled_positive_cache_always_asks_the_backend() {
    let rig = standard_rig(test_settings().with_max_cache_size(0)).await;

    for _ in 0..3 {
        let result = rig
            .engine
            .authenticate("test.com", "jeff", "foobar")
            .await
            .unwrap();
        assert_eq!(result.status, AuthStatus::Authenticated);
    }
    assert_eq!(rig.backend.call_count(), 3);
    assert!(!rig.engine.is_credential_cached("test.com", "jeff"));
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn injected_credentials_serve_without_backend_calls() {
    let rig = standard_rig(test_settings()).await;

    rig.engine
        .add_credentials("test.com", "jane", "pw", Duration::from_secs(30))
        .unwrap();
    let result = rig
        .engine
        .authenticate("test.com", "jane", "pw")
        .await
        .unwrap();
    assert_eq!(result.status, AuthStatus::Authenticated);
    assert_eq!(rig.backend.call_count(), 0);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn backend_failure_propagates_and_is_not_cached() {
    let rig = standard_rig(test_settings()).await;
    for account in ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8"] {
        rig.backend.add_account("test.com", account, "pw").await;
    }
    rig.backend.set_failing("test.com", "a2").await;

    let mut handles = Vec::new();
    for account in ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8", "jeff"] {
        let engine = std::sync::Arc::clone(&rig.engine);
        let password = if account == "jeff" { "foobar" } else { "pw" };
        handles.push(tokio::spawn(async move {
            (
                account,
                engine.authenticate("test.com", account, password).await,
            )
        }));
    }

    for handle in handles {
        let (account, outcome) = handle.await.unwrap();
        if account == "a2" {
            assert!(outcome.is_err());
        } else {
            assert_eq!(outcome.unwrap().status, AuthStatus::Authenticated);
        }
    }
    // the thrown request must not have grown the negative cache
    assert!(rig.engine.lockout_snapshot("test.com", "a2").is_none());
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn map_reload_swaps_realms_atomically() {
    let rig = start_engine(
        test_settings(),
        &[
            "x.com$$memory$$$$x.com;amy;pw",
            "test.com$$memory$$$$test.com;jeff;foobar",
        ],
    )
    .await;

    let ok = rig.engine.authenticate("x.com", "amy", "pw").await.unwrap();
    assert_eq!(ok.status, AuthStatus::Authenticated);

    // x.com disappears, y.com appears
    rig.provider
        .set_entries(vec![
            "test.com$$memory$$$$test.com;jeff;foobar".to_string(),
            "y.com$$memory$$$$y.com;bob;hunter2".to_string(),
        ])
        .await;
    rig.engine.load_realm_map().await.unwrap();

    let gone = rig
        .engine
        .authenticate("x.com", "amy", "pw")
        .await
        .unwrap();
    assert_eq!(gone.status, AuthStatus::BadRealm);

    let fresh = rig
        .engine
        .authenticate("y.com", "bob", "hunter2")
        .await
        .unwrap();
    assert_eq!(fresh.status, AuthStatus::Authenticated);

    let mut realms = rig.engine.active_realms();
    realms.sort();
    assert_eq!(realms, vec!["test.com", "y.com"]);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn duplicate_realm_in_snapshot_keeps_the_first_entry() {
    // the static provider rejects duplicates itself, so feed the engine a
    // map where only adoption-time dedup can notice the clash
    let rig = start_engine(
        test_settings(),
        &["test.com$$memory$$$$test.com;jeff;foobar"],
    )
    .await;
    assert_eq!(rig.engine.active_realms(), vec!["test.com"]);
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn lifecycle_guards() {
    let rig = standard_rig(test_settings()).await;

    // double start
    let provider = std::sync::Arc::clone(&rig.provider);
    assert!(rig.engine.start(Box::new(provider)).await.is_err());

    rig.engine.stop().await.unwrap();
    assert!(!rig.engine.is_running());

    // operations after stop
    assert!(rig
        .engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .is_err());
    assert!(rig.engine.stop().await.is_err());
    assert!(rig
        .engine
        .add_credentials("test.com", "jeff", "foobar", Duration::from_secs(5))
        .is_err());
}

#[tokio::test]
async fn authenticated_event_is_published() {
    let rig = standard_rig(test_settings()).await;
    let mut events = rig.engine.subscribe();

    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();

    match events.try_recv().unwrap() {
        EngineEvent::Authenticated {
            realm,
            account,
            password,
            ttl,
        } => {
            assert_eq!(realm, "test.com");
            assert_eq!(account, "jeff");
            assert_eq!(password, "foobar");
            assert!(ttl > Duration::ZERO);
        }
        other => panic!("unexpected event {:?}", other),
    }
    // a cache hit publishes nothing
    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    rig.engine.stop().await.unwrap();
}

#[tokio::test]
async fn counters_track_the_pipeline() {
    let rig = standard_rig(test_settings()).await;

    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    rig.engine
        .authenticate("test.com", "jeff", "foobar")
        .await
        .unwrap();
    rig.engine
        .authenticate("ghost.example", "jeff", "pw")
        .await
        .unwrap();

    let snapshot = rig.engine.snapshot();
    assert_eq!(snapshot.total_auths, 3);
    assert_eq!(snapshot.backend_calls, 1);
    assert_eq!(snapshot.positive_hits, 1);
    assert_eq!(snapshot.bad_realms, 1);
    assert_eq!(snapshot.positive_cache_size, 1);
    assert_eq!(snapshot.realm_count, 1);
    rig.engine.stop().await.unwrap();
}
