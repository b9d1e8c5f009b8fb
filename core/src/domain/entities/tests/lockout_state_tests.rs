//! Unit tests for lockout state transitions

use std::time::Duration;

use crate::domain::entities::auth_result::AuthStatus;
use crate::domain::entities::lockout_state::LockoutState;
use crate::domain::entities::realm_mapping::LockoutPolicy;

const NAK_TTL: Duration = Duration::from_secs(900);

fn policy(count: u32, threshold_secs: u64, time_secs: u64) -> LockoutPolicy {
    LockoutPolicy {
        count,
        threshold: Duration::from_secs(threshold_secs),
        time: Duration::from_secs(time_secs),
    }
}

#[test]
fn first_failure_starts_tally() {
    let state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("wrong"),
        policy(5, 60, 300),
        NAK_TTL,
    );
    assert_eq!(state.fail_count, 1);
    assert!(!state.is_locked);
    assert_eq!(state.status, AuthStatus::AccessDenied);
    // ttl bounded by the threshold window
    assert_eq!(state.ttl, Duration::from_secs(60));
    assert!(state.knows_password("wrong"));
    assert!(!state.knows_password("other"));
}

#[test]
fn lockout_count_of_one_locks_immediately() {
    let state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::BadPassword,
        Some("wrong"),
        policy(1, 60, 300),
        NAK_TTL,
    );
    assert!(state.is_locked);
    assert_eq!(state.status, AuthStatus::AccountLocked);
    assert_eq!(state.ttl, Duration::from_secs(300));
}

#[test]
fn reaching_the_count_locks() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("a"),
        policy(3, 300, 600),
        NAK_TTL,
    );
    assert!(!state.record_failure(AuthStatus::AccessDenied, Some("b"), NAK_TTL));
    assert!(!state.is_locked);

    let just_locked = state.record_failure(AuthStatus::AccessDenied, Some("c"), NAK_TTL);
    assert!(just_locked);
    assert!(state.is_locked);
    assert_eq!(state.status, AuthStatus::AccountLocked);
    assert_eq!(state.fail_count, 3);
    // fail_count stopped at the lockout count
    assert!(state.fail_count <= state.policy.count);
}

#[test]
fn locked_state_no_longer_increments() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("a"),
        policy(1, 60, 300),
        NAK_TTL,
    );
    assert!(state.is_locked);
    let before = state.fail_count;
    assert!(!state.record_failure(AuthStatus::AccessDenied, Some("b"), NAK_TTL));
    assert_eq!(state.fail_count, before);
}

#[test]
fn zero_threshold_never_locks() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("a"),
        policy(1, 0, 300),
        NAK_TTL,
    );
    assert!(!state.is_locked);
    for _ in 0..10 {
        assert!(!state.record_failure(AuthStatus::AccessDenied, Some("a"), NAK_TTL));
    }
    assert!(!state.is_locked);
    // with lockout disabled the record is not worth caching
    assert_eq!(state.ttl, Duration::ZERO);
}

#[test]
fn repeat_password_still_counts_as_failure() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::BadPassword,
        Some("wrong"),
        policy(2, 300, 600),
        NAK_TTL,
    );
    // same bad password resubmitted
    let just_locked = state.record_failure(AuthStatus::BadPassword, Some("wrong"), NAK_TTL);
    assert!(just_locked);
    assert_eq!(state.bad_password_count(), 1);
}

#[test]
fn ttl_clamped_to_nak_cache_ceiling() {
    let short_ceiling = Duration::from_secs(30);
    let state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("a"),
        policy(1, 60, 300),
        short_ceiling,
    );
    assert!(state.is_locked);
    assert_eq!(state.ttl, short_ceiling);
}

#[test]
fn force_lock_overrides_history() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        Some("a"),
        policy(5, 60, 300),
        NAK_TTL,
    );
    assert!(!state.is_locked);
    state.force_lock(Duration::from_secs(120), NAK_TTL);
    assert!(state.is_locked);
    assert_eq!(state.status, AuthStatus::AccountLocked);
    assert_eq!(state.ttl, Duration::from_secs(120));
}

#[test]
fn peer_failure_without_password_increments() {
    let mut state = LockoutState::first_failure(
        "test.com",
        "jeff",
        AuthStatus::AccessDenied,
        None,
        policy(2, 300, 600),
        NAK_TTL,
    );
    assert_eq!(state.bad_password_count(), 0);
    let just_locked = state.record_failure(AuthStatus::AccessDenied, None, NAK_TTL);
    assert!(just_locked);
}
