//! Unit tests for authentication result values

use std::time::Duration;

use crate::domain::entities::auth_result::{
    AuthResult, AuthStatus, CachedCredential, DEFAULT_MAX_CACHE_TIME,
};

#[test]
fn status_codes_round_trip() {
    for code in 0..=8 {
        let status = AuthStatus::from_code(code).expect("code in range");
        assert_eq!(status.code() as i64, code);
    }
    assert_eq!(AuthStatus::from_code(9), None);
    assert_eq!(AuthStatus::from_code(-1), None);
}

#[test]
fn scalar_codes_match_backend_contract() {
    assert_eq!(AuthStatus::Authenticated.code(), 0);
    assert_eq!(AuthStatus::AccessDenied.code(), 1);
    assert_eq!(AuthStatus::BadRealm.code(), 2);
    assert_eq!(AuthStatus::BadAccount.code(), 3);
    assert_eq!(AuthStatus::BadPassword.code(), 4);
    assert_eq!(AuthStatus::AccountDisabled.code(), 5);
    assert_eq!(AuthStatus::AccountLocked.code(), 6);
    assert_eq!(AuthStatus::BadRequest.code(), 7);
    assert_eq!(AuthStatus::ServerError.code(), 8);
}

#[test]
fn authenticated_result_uses_default_suggestion() {
    let result = AuthResult::authenticated();
    assert!(result.is_authenticated());
    assert_eq!(result.max_cache_time, DEFAULT_MAX_CACHE_TIME);
    assert_eq!(result.message, None);
}

#[test]
fn message_is_attached() {
    let result = AuthResult::rejected(AuthStatus::AccessDenied).with_message("no such user");
    assert!(!result.is_authenticated());
    assert_eq!(result.message.as_deref(), Some("no such user"));
}

#[test]
fn cached_credential_compares_passwords() {
    let entry = CachedCredential::new("foobar", Duration::from_secs(60));
    assert!(entry.password_matches("foobar"));
    assert!(!entry.password_matches("foobaz"));
    assert!(!entry.password_matches(""));
}
