//! Per-account failure tracking and lockout records.

use std::time::Duration;

use crate::domain::entities::auth_result::AuthStatus;
use crate::domain::entities::realm_mapping::LockoutPolicy;

/// Negative-cache record for one account key: the rejection last reported
/// to callers, the consecutive-failure tally, and the lock flag.
///
/// The policy triple is a snapshot taken from the realm mapping when the
/// record was created; a map reload does not change the rules for an
/// account already accumulating failures.
#[derive(Debug, Clone)]
pub struct LockoutState {
    /// Realm the account belongs to (original casing, for events and logs)
    pub realm: String,
    /// Account name (original casing)
    pub account: String,
    /// Outcome reported to callers while this record is live
    pub status: AuthStatus,
    /// Consecutive failures observed
    pub fail_count: u32,
    /// Policy snapshot from the realm mapping
    pub policy: LockoutPolicy,
    /// Whether the account is locked
    pub is_locked: bool,
    /// How long this record remains cached
    pub ttl: Duration,
    /// Passwords already rejected for this account
    bad_passwords: Vec<String>,
}

impl LockoutState {
    /// Create the record for the first observed failure.
    ///
    /// With lockout enabled and a `count` of one or less the account locks
    /// immediately; callers check [`is_locked`](Self::is_locked) to decide
    /// whether to raise a lock event.
    pub fn first_failure(
        realm: &str,
        account: &str,
        status: AuthStatus,
        password: Option<&str>,
        policy: LockoutPolicy,
        nak_cache_ttl: Duration,
    ) -> Self {
        let mut state = Self {
            realm: realm.to_string(),
            account: account.to_string(),
            status,
            fail_count: 1,
            policy,
            is_locked: false,
            ttl: policy.threshold.min(nak_cache_ttl),
            bad_passwords: password.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };
        if policy.enabled() && policy.count <= 1 {
            state.lock(nak_cache_ttl);
        }
        state
    }

    /// Record another failure. Returns `true` when this failure promoted
    /// the record to locked, so the caller can raise the lock event.
    ///
    /// A repeat of an already-rejected password still counts as a failure
    /// for lockout evaluation. Once locked, further failures no longer
    /// increment the tally.
    pub fn record_failure(
        &mut self,
        status: AuthStatus,
        password: Option<&str>,
        nak_cache_ttl: Duration,
    ) -> bool {
        if self.is_locked {
            return false;
        }

        self.fail_count += 1;
        self.status = status;

        let just_locked = if self.policy.enabled() && self.fail_count >= self.policy.count {
            self.lock(nak_cache_ttl);
            true
        } else {
            false
        };

        if let Some(password) = password {
            if !self.knows_password(password) {
                self.bad_passwords.push(password.to_string());
            }
        }

        just_locked
    }

    /// Force-lock irrespective of history, as driven by the explicit
    /// lock API or a peer directive. Resets the lock duration.
    pub fn force_lock(&mut self, duration: Duration, nak_cache_ttl: Duration) {
        self.policy.time = duration;
        self.fail_count = self.fail_count.max(self.policy.count);
        self.lock(nak_cache_ttl);
    }

    fn lock(&mut self, nak_cache_ttl: Duration) {
        self.is_locked = true;
        self.status = AuthStatus::AccountLocked;
        self.ttl = self.policy.time.min(nak_cache_ttl);
    }

    /// Constant-time check whether the password was already rejected
    pub fn knows_password(&self, candidate: &str) -> bool {
        let mut known = false;
        for rejected in &self.bad_passwords {
            known |= constant_time_eq::constant_time_eq(rejected.as_bytes(), candidate.as_bytes());
        }
        known
    }

    /// Number of distinct rejected passwords on record
    pub fn bad_password_count(&self) -> usize {
        self.bad_passwords.len()
    }
}
