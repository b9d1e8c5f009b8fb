//! The authentication engine request pipeline.
//!
//! The engine is shared across request threads. One mutex serializes the
//! realm map, both caches, and the counter gauges; critical sections are
//! short and never cross an `.await`. Backend calls, security logging,
//! and event delivery all happen outside the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use ag_shared::config::EngineSettings;

use crate::backends::{BackendContext, BackendRegistry};
use crate::cache::TtlLruCache;
use crate::domain::entities::{
    AuthResult, AuthStatus, CachedCredential, LockoutPolicy, LockoutState, RealmMapping,
};
use crate::domain::value_objects::AccountKey;
use crate::engine::counters::{CounterSnapshot, EngineCounters};
use crate::engine::events::{EngineEvent, EventSink};
use crate::errors::{EngineError, EngineResult};
use crate::realm_map::RealmMapProvider;

type RealmMap = HashMap<String, Arc<RealmMapping>>;

/// Mutable engine state guarded by the engine lock
struct EngineState {
    realm_map: RealmMap,
    positive: Option<TtlLruCache<AccountKey, CachedCredential>>,
    negative: Option<TtlLruCache<AccountKey, LockoutState>>,
    next_flush: Instant,
    next_map_load: Instant,
}

/// Outcome of the cache-consultation phase
enum Route {
    /// Answer determined without touching the backend
    Done(AuthResult),
    /// Caches had nothing; delegate to the mapping's backend
    Backend(Arc<RealmMapping>),
}

/// The clustered credential-verification engine.
///
/// Construct with [`AuthEngine::new`], wrap in an `Arc`, then
/// [`start`](Self::start) it with a realm map provider. Every public
/// operation is thread-safe.
pub struct AuthEngine {
    settings: EngineSettings,
    registry: Arc<BackendRegistry>,
    counters: Arc<EngineCounters>,
    events: Arc<EventSink>,
    instance_id: Uuid,
    state: Mutex<Option<EngineState>>,
    provider: tokio::sync::Mutex<Option<Box<dyn RealmMapProvider>>>,
    background: Mutex<Option<JoinHandle<()>>>,
}

impl AuthEngine {
    const EVENT_CHANNEL_CAPACITY: usize = 256;

    pub fn new(settings: EngineSettings, registry: Arc<BackendRegistry>) -> Self {
        Self {
            settings,
            registry,
            counters: Arc::new(EngineCounters::default()),
            events: Arc::new(EventSink::new(Self::EVENT_CHANNEL_CAPACITY)),
            instance_id: Uuid::new_v4(),
            state: Mutex::new(None),
            provider: tokio::sync::Mutex::new(None),
            background: Mutex::new(None),
        }
    }

    /// Identity of this engine instance within the cluster
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn counters(&self) -> Arc<EngineCounters> {
        Arc::clone(&self.counters)
    }

    /// Current counter values, with cache gauges refreshed first
    pub fn snapshot(&self) -> CounterSnapshot {
        {
            let guard = self.lock_state();
            if let Some(state) = guard.as_ref() {
                self.counters.set_cache_gauges(
                    state.positive.as_ref().map_or(0, TtlLruCache::len),
                    state.negative.as_ref().map_or(0, TtlLruCache::len),
                );
                self.counters.set_realm_count(state.realm_map.len());
            }
        }
        self.counters.snapshot()
    }

    /// Receive engine events. Subscribers drain on their own tasks, so
    /// callbacks never run under the engine lock.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_some()
    }

    /// Load the initial realm map synchronously and install the periodic
    /// background task. Fails if the engine is already running or the
    /// provider cannot produce a usable map.
    pub async fn start(self: &Arc<Self>, provider: Box<dyn RealmMapProvider>) -> EngineResult<()> {
        if self.is_running() {
            return Err(EngineError::invariant("engine is already running"));
        }

        provider.open(&self.settings).await?;
        *self.provider.lock().await = Some(provider);

        {
            let mut guard = self.lock_state();
            if guard.is_some() {
                return Err(EngineError::invariant("engine is already running"));
            }
            let now = Instant::now();
            *guard = Some(EngineState {
                realm_map: HashMap::new(),
                positive: self.new_positive_cache(),
                negative: self.new_negative_cache(),
                next_flush: now + self.settings.cache_flush_interval,
                next_map_load: now + self.settings.realm_map_load_interval,
            });
        }

        if let Err(err) = self.load_realm_map().await {
            self.teardown().await;
            return Err(err);
        }

        *self.lock_background() = Some(self.spawn_background_task());
        info!(instance = %self.instance_id, "authentication engine started");
        Ok(())
    }

    /// Cancel the background task, close the realm map provider and every
    /// backend, and release the caches.
    pub async fn stop(&self) -> EngineResult<()> {
        if !self.is_running() {
            return Err(EngineError::invariant("engine is not running"));
        }
        self.teardown().await;
        Ok(())
    }

    async fn teardown(&self) {
        if let Some(handle) = self.lock_background().take() {
            handle.abort();
        }
        let state = self.lock_state().take();
        if let Some(state) = state {
            // Each close waits for its in-flight authenticate calls, then
            // the caches drop without raising unlock events.
            for mapping in state.realm_map.into_values() {
                mapping.extension.close().await;
            }
        }
        if let Some(provider) = self.provider.lock().await.take() {
            provider.close().await;
        }
        info!(instance = %self.instance_id, "authentication engine stopped");
    }

    /// Verify one credential triple through the cache → lockout →
    /// backend pipeline. Backend infrastructure failures propagate as
    /// errors and are never cached.
    pub async fn authenticate(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> EngineResult<AuthResult> {
        let outcome = self.authenticate_inner(realm, account, password).await;
        match &outcome {
            Ok(result) => self.log_outcome(realm, account, result),
            Err(err) => {
                if self.settings.log_auth_failure {
                    error!(
                        target: "security",
                        realm,
                        account,
                        error = %err,
                        "authentication request failed"
                    );
                }
            }
        }
        outcome
    }

    async fn authenticate_inner(
        &self,
        realm: &str,
        account: &str,
        password: &str,
    ) -> EngineResult<AuthResult> {
        let mut pending: Vec<EngineEvent> = Vec::new();

        // Phase 1: realm map and caches, under the engine lock
        let route = {
            let mut guard = self.lock_state();
            let state = guard
                .as_mut()
                .ok_or_else(|| EngineError::invariant("engine is not running"))?;
            self.counters.inc_total_auths();
            self.consult_caches(state, realm, account, password, &mut pending)
        };

        let result = match route {
            Route::Done(result) => {
                self.events.emit_all(pending);
                return Ok(result);
            }
            Route::Backend(mapping) => {
                // Phase 2: the backend call runs outside the lock; it may
                // block on network I/O for seconds
                self.counters.inc_backend_calls();
                match mapping
                    .extension
                    .authenticate(realm, account, password)
                    .await
                {
                    Ok(result) => {
                        // Phase 3: absorb the outcome into the caches
                        let mut guard = self.lock_state();
                        match guard.as_mut() {
                            Some(state) => self.absorb_backend_result(
                                state,
                                &mapping,
                                realm,
                                account,
                                password,
                                result,
                                &mut pending,
                            ),
                            // stopped mid-flight; hand the result through
                            // without caching
                            None => result,
                        }
                    }
                    Err(err) => {
                        self.counters.inc_backend_failures();
                        return Err(EngineError::Backend(err));
                    }
                }
            }
        };

        self.events.emit_all(pending);
        Ok(result)
    }

    /// Pipeline steps 2-5: realm lookup, empty-password rejection,
    /// positive hit, lockout / known-bad-password hit.
    fn consult_caches(
        &self,
        state: &mut EngineState,
        realm: &str,
        account: &str,
        password: &str,
        pending: &mut Vec<EngineEvent>,
    ) -> Route {
        let mapping = match state.realm_map.get(&realm.to_lowercase()) {
            Some(mapping) => Arc::clone(mapping),
            None => {
                // computed cheaply from the in-memory map; never cached
                self.counters.inc_bad_realms();
                return Route::Done(
                    AuthResult::new(AuthStatus::BadRealm, self.settings.cache_ttl)
                        .with_message(format!("realm '{}' is not configured", realm)),
                );
            }
        };

        if password.is_empty() {
            return Route::Done(AuthResult::new(
                AuthStatus::BadPassword,
                self.settings.nak_cache_ttl,
            ));
        }

        let key = AccountKey::new(realm, account);

        if let Some(cache) = state.positive.as_mut() {
            if let Some(entry) = cache.try_get(&key) {
                if entry.password_matches(password) {
                    self.counters.inc_positive_hits();
                    return Route::Done(AuthResult::new(
                        AuthStatus::Authenticated,
                        entry.max_cache_time,
                    ));
                }
                // wrong password for a cached account: fall through to the
                // negative cache and, if needed, the backend
            }
        }

        if let Some(cache) = state.negative.as_mut() {
            if let Some(lockout) = cache.try_get_mut(&key) {
                if lockout.is_locked {
                    self.counters.inc_nak_hits();
                    return Route::Done(AuthResult::new(AuthStatus::AccountLocked, lockout.ttl));
                }
                if lockout.knows_password(password) {
                    self.counters.inc_nak_hits();
                    let reported = lockout.status;
                    let just_locked = lockout.record_failure(
                        reported,
                        Some(password),
                        self.settings.nak_cache_ttl,
                    );
                    let status = lockout.status;
                    let ttl = lockout.ttl;
                    let event_realm = lockout.realm.clone();
                    let event_account = lockout.account.clone();
                    if just_locked {
                        self.counters.inc_lockouts();
                        cache.touch(&key, ttl);
                        pending.push(EngineEvent::LockStatusChanged {
                            realm: event_realm,
                            account: event_account,
                            locked: true,
                            ttl,
                        });
                    }
                    return Route::Done(AuthResult::new(status, ttl));
                }
                // a password this record has not seen yet: ask the backend
            }
        }

        Route::Backend(mapping)
    }

    /// Pipeline steps 7-8: write the backend outcome into the caches and
    /// schedule events.
    #[allow(clippy::too_many_arguments)]
    fn absorb_backend_result(
        &self,
        state: &mut EngineState,
        mapping: &RealmMapping,
        realm: &str,
        account: &str,
        password: &str,
        result: AuthResult,
        pending: &mut Vec<EngineEvent>,
    ) -> AuthResult {
        let key = AccountKey::new(realm, account);

        if result.is_authenticated() {
            let mut ttl = result.max_cache_time.min(mapping.max_cache_time);
            if self.settings.positive_cache_enabled() {
                ttl = ttl.min(self.settings.cache_ttl);
            }
            if let Some(cache) = state.positive.as_mut() {
                // an existing entry keeps its TTL; only add_credentials
                // refreshes it
                if !cache.contains(&key) {
                    cache.add(key, CachedCredential::new(password, ttl), Some(ttl));
                }
            }
            pending.push(EngineEvent::Authenticated {
                realm: realm.to_string(),
                account: account.to_string(),
                password: password.to_string(),
                ttl,
            });
            return AuthResult {
                status: AuthStatus::Authenticated,
                message: result.message,
                max_cache_time: ttl,
            };
        }

        let nak_ttl = self.settings.nak_cache_ttl;
        let cache = match state.negative.as_mut() {
            Some(cache) => cache,
            // negative caching disabled: report the backend outcome as-is
            None => return result,
        };

        if let Some(lockout) = cache.try_get_mut(&key) {
            let just_locked = lockout.record_failure(result.status, Some(password), nak_ttl);
            let status = lockout.status;
            let ttl = lockout.ttl;
            let event_realm = lockout.realm.clone();
            let event_account = lockout.account.clone();
            if just_locked {
                self.counters.inc_lockouts();
                cache.touch(&key, ttl);
                pending.push(EngineEvent::LockStatusChanged {
                    realm: event_realm,
                    account: event_account,
                    locked: true,
                    ttl,
                });
            }
            return AuthResult::new(status, ttl);
        }

        let lockout = LockoutState::first_failure(
            realm,
            account,
            result.status,
            Some(password),
            mapping.lockout,
            nak_ttl,
        );
        let status = lockout.status;
        let ttl = lockout.ttl;
        if lockout.is_locked {
            self.counters.inc_lockouts();
            pending.push(EngineEvent::LockStatusChanged {
                realm: realm.to_string(),
                account: account.to_string(),
                locked: true,
                ttl,
            });
        }
        if !ttl.is_zero() {
            cache.add(key, lockout, Some(ttl));
        }
        AuthResult::new(status, ttl)
    }

    /// Synchronously rebuild the realm map from the provider and swap it
    /// in atomically. Extensions of the replaced map close once their
    /// in-flight calls return.
    pub async fn load_realm_map(&self) -> EngineResult<()> {
        let specs = {
            let provider = self.provider.lock().await;
            let provider = provider
                .as_ref()
                .ok_or_else(|| EngineError::invariant("engine is not running"))?;
            provider.get_map().await?
        };

        // Open the new extensions before taking the engine lock; backend
        // open may touch the network.
        let mut mappings: RealmMap = HashMap::new();
        for spec in &specs {
            let key = spec.realm_key();
            if mappings.contains_key(&key) {
                warn!(realm = %spec.realm, "duplicate realm in map snapshot, keeping the first entry");
                continue;
            }
            let opened = match self.registry.create(&spec.extension_type) {
                Ok(backend) => {
                    let ctx = BackendContext::new(
                        spec.args.clone(),
                        spec.query.clone(),
                        Arc::clone(&self.counters),
                    );
                    match backend.open(ctx).await {
                        Ok(()) => RealmMapping::bind(spec, &self.settings, backend),
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err),
            };
            match opened {
                Ok(mapping) => {
                    mappings.insert(key, Arc::new(mapping));
                }
                Err(err) => {
                    close_mappings(mappings);
                    return Err(err);
                }
            }
        }

        let realm_count = mappings.len();
        enum Swap {
            Replaced(RealmMap),
            Stopped(RealmMap),
        }
        let swapped = {
            let mut guard = self.lock_state();
            match guard.as_mut() {
                Some(state) => Swap::Replaced(std::mem::replace(&mut state.realm_map, mappings)),
                None => Swap::Stopped(mappings),
            }
        };
        match swapped {
            Swap::Replaced(old) => {
                self.counters.inc_map_loads();
                self.counters.set_realm_count(realm_count);
                close_mappings(old);
                info!(realms = realm_count, "realm map loaded");
                Ok(())
            }
            Swap::Stopped(fresh) => {
                close_mappings(fresh);
                Err(EngineError::invariant("engine is not running"))
            }
        }
    }

    /// Inject a trusted accepted credential, as when a peer reports a
    /// successful authentication. Unlike the pipeline, an existing entry
    /// is refreshed.
    pub fn add_credentials(
        &self,
        realm: &str,
        account: &str,
        password: &str,
        ttl: Duration,
    ) -> EngineResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| EngineError::invariant("engine is not running"))?;
        if let Some(cache) = state.positive.as_mut() {
            let ttl = ttl.min(self.settings.cache_ttl);
            cache.add(
                AccountKey::new(realm, account),
                CachedCredential::new(password, ttl),
                Some(ttl),
            );
        }
        Ok(())
    }

    /// Force-lock an account irrespective of its failure history and drop
    /// any cached credential for it.
    pub fn lock_account(&self, realm: &str, account: &str, duration: Duration) -> EngineResult<()> {
        let mut pending = Vec::new();
        {
            let mut guard = self.lock_state();
            let state = guard
                .as_mut()
                .ok_or_else(|| EngineError::invariant("engine is not running"))?;
            let key = AccountKey::new(realm, account);
            let nak_ttl = self.settings.nak_cache_ttl;

            if let Some(cache) = state.positive.as_mut() {
                cache.remove(&key);
            }

            let policy = state
                .realm_map
                .get(&realm.to_lowercase())
                .map(|mapping| mapping.lockout)
                .unwrap_or(LockoutPolicy {
                    count: self.settings.lockout_count,
                    threshold: self.settings.lockout_threshold,
                    time: duration,
                });

            if let Some(cache) = state.negative.as_mut() {
                if let Some(lockout) = cache.try_get_mut(&key) {
                    lockout.force_lock(duration, nak_ttl);
                    let ttl = lockout.ttl;
                    cache.touch(&key, ttl);
                    pending.push(EngineEvent::LockStatusChanged {
                        realm: realm.to_string(),
                        account: account.to_string(),
                        locked: true,
                        ttl,
                    });
                } else {
                    let mut lockout = LockoutState::first_failure(
                        realm,
                        account,
                        AuthStatus::AccountLocked,
                        None,
                        policy,
                        nak_ttl,
                    );
                    lockout.force_lock(duration, nak_ttl);
                    let ttl = lockout.ttl;
                    cache.add(key, lockout, Some(ttl));
                    pending.push(EngineEvent::LockStatusChanged {
                        realm: realm.to_string(),
                        account: account.to_string(),
                        locked: true,
                        ttl,
                    });
                }
                self.counters.inc_lockouts();
            }
        }
        self.events.emit_all(pending);
        Ok(())
    }

    /// Mirror a failed authentication observed by a peer. May promote the
    /// account to locked under the realm's policy.
    pub fn increment_fail_count(&self, realm: &str, account: &str) -> EngineResult<()> {
        let mut pending = Vec::new();
        {
            let mut guard = self.lock_state();
            let state = guard
                .as_mut()
                .ok_or_else(|| EngineError::invariant("engine is not running"))?;
            let key = AccountKey::new(realm, account);
            let nak_ttl = self.settings.nak_cache_ttl;
            let policy = state
                .realm_map
                .get(&realm.to_lowercase())
                .map(|mapping| mapping.lockout)
                .unwrap_or(LockoutPolicy {
                    count: self.settings.lockout_count,
                    threshold: self.settings.lockout_threshold,
                    time: self.settings.lockout_time,
                });

            if let Some(cache) = state.negative.as_mut() {
                if let Some(lockout) = cache.try_get_mut(&key) {
                    let reported = lockout.status;
                    let just_locked = lockout.record_failure(reported, None, nak_ttl);
                    let ttl = lockout.ttl;
                    if just_locked {
                        self.counters.inc_lockouts();
                        cache.touch(&key, ttl);
                        pending.push(EngineEvent::LockStatusChanged {
                            realm: realm.to_string(),
                            account: account.to_string(),
                            locked: true,
                            ttl,
                        });
                    }
                } else {
                    let lockout = LockoutState::first_failure(
                        realm,
                        account,
                        AuthStatus::AccessDenied,
                        None,
                        policy,
                        nak_ttl,
                    );
                    let ttl = lockout.ttl;
                    if lockout.is_locked {
                        self.counters.inc_lockouts();
                        pending.push(EngineEvent::LockStatusChanged {
                            realm: realm.to_string(),
                            account: account.to_string(),
                            locked: true,
                            ttl,
                        });
                    }
                    if !ttl.is_zero() {
                        cache.add(key, lockout, Some(ttl));
                    }
                }
            }
        }
        self.events.emit_all(pending);
        Ok(())
    }

    /// Drop one account's accepted credential, or every credential in a
    /// realm when `account` is `None`.
    pub fn flush_cache(&self, realm: &str, account: Option<&str>) -> EngineResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| EngineError::invariant("engine is not running"))?;
        if let Some(cache) = state.positive.as_mut() {
            match account {
                Some(account) => {
                    cache.remove(&AccountKey::new(realm, account));
                }
                None => {
                    for key in cache.keys() {
                        if key.in_realm(realm) {
                            cache.remove(&key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop one account's lockout record (reporting a lock release if it
    /// was locked), or a whole realm's records with release reporting
    /// suppressed.
    pub fn flush_nak_cache(&self, realm: &str, account: Option<&str>) -> EngineResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| EngineError::invariant("engine is not running"))?;
        if let Some(cache) = state.negative.as_mut() {
            match account {
                Some(account) => {
                    cache.remove(&AccountKey::new(realm, account));
                }
                None => {
                    let _quiet = self.events.suppressed();
                    for key in cache.keys() {
                        if key.in_realm(realm) {
                            cache.remove(&key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop every accepted credential
    pub fn clear_cache(&self) -> EngineResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| EngineError::invariant("engine is not running"))?;
        if let Some(cache) = state.positive.as_mut() {
            cache.clear();
        }
        Ok(())
    }

    /// Drop every lockout record without raising an unlock storm
    pub fn clear_nak_cache(&self) -> EngineResult<()> {
        let mut guard = self.lock_state();
        let state = guard
            .as_mut()
            .ok_or_else(|| EngineError::invariant("engine is not running"))?;
        if let Some(cache) = state.negative.as_mut() {
            let _quiet = self.events.suppressed();
            cache.clear();
        }
        Ok(())
    }

    /// Whether an accepted credential is cached for the account.
    /// Diagnostic view; does not disturb cache recency or statistics.
    pub fn is_credential_cached(&self, realm: &str, account: &str) -> bool {
        let guard = self.lock_state();
        guard
            .as_ref()
            .and_then(|state| state.positive.as_ref())
            .map_or(false, |cache| {
                cache.contains(&AccountKey::new(realm, account))
            })
    }

    /// Diagnostic view of an account's lockout record, if any
    pub fn lockout_snapshot(&self, realm: &str, account: &str) -> Option<LockoutState> {
        let guard = self.lock_state();
        guard
            .as_ref()
            .and_then(|state| state.negative.as_ref())
            .and_then(|cache| cache.peek(&AccountKey::new(realm, account)))
            .cloned()
    }

    /// Realms in the active map, sorted
    pub fn active_realms(&self) -> Vec<String> {
        let guard = self.lock_state();
        let mut realms: Vec<String> = guard
            .as_ref()
            .map(|state| state.realm_map.keys().cloned().collect())
            .unwrap_or_default();
        realms.sort();
        realms
    }

    fn log_outcome(&self, realm: &str, account: &str, result: &AuthResult) {
        if result.is_authenticated() {
            if self.settings.log_auth_success {
                info!(
                    target: "security",
                    realm,
                    account,
                    "authentication succeeded"
                );
            }
        } else if self.settings.log_auth_failure {
            warn!(
                target: "security",
                realm,
                account,
                status = %result.status,
                "authentication failed"
            );
        }
    }

    fn new_positive_cache(&self) -> Option<TtlLruCache<AccountKey, CachedCredential>> {
        if !self.settings.positive_cache_enabled() {
            return None;
        }
        Some(TtlLruCache::new(
            self.settings.max_cache_size,
            self.settings.cache_ttl,
        ))
    }

    fn new_negative_cache(&self) -> Option<TtlLruCache<AccountKey, LockoutState>> {
        if !self.settings.negative_cache_enabled() {
            return None;
        }
        let sink = Arc::clone(&self.events);
        Some(
            TtlLruCache::new(self.settings.max_nak_cache_size, self.settings.nak_cache_ttl)
                .with_eviction_hook(move |_key, state: &LockoutState| {
                    // a locked record leaving the cache means the lock is
                    // released, however it left
                    if state.is_locked {
                        sink.emit_if_enabled(EngineEvent::LockStatusChanged {
                            realm: state.realm.clone(),
                            account: state.account.clone(),
                            locked: false,
                            ttl: Duration::ZERO,
                        });
                    }
                }),
        )
    }

    fn spawn_background_task(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        // interval() rejects a zero period
        let period = engine
            .settings
            .bk_task_interval
            .max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                engine.background_pass().await;
            }
        })
    }

    /// One background tick: flush expired cache entries when due, reload
    /// the realm map when due, refresh counter gauges.
    async fn background_pass(&self) {
        let now = Instant::now();
        let mut reload_due = false;
        {
            let mut guard = self.lock_state();
            let state = match guard.as_mut() {
                Some(state) => state,
                None => return,
            };

            if now >= state.next_flush {
                state.next_flush = now + self.settings.cache_flush_interval;
                let mut flushed = 0;
                if let Some(cache) = state.positive.as_mut() {
                    flushed += cache.flush_expired();
                }
                if let Some(cache) = state.negative.as_mut() {
                    flushed += cache.flush_expired();
                }
                if flushed > 0 {
                    info!(entries = flushed, "flushed expired cache entries");
                }
            }

            if now >= state.next_map_load {
                state.next_map_load = now + self.settings.realm_map_load_interval;
                reload_due = true;
            }

            self.counters.set_cache_gauges(
                state.positive.as_ref().map_or(0, TtlLruCache::len),
                state.negative.as_ref().map_or(0, TtlLruCache::len),
            );
            self.counters.set_realm_count(state.realm_map.len());
        }

        if reload_due {
            if let Err(err) = self.load_realm_map().await {
                warn!(error = %err, "realm map reload failed, keeping the current map");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<EngineState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_background(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Close every extension of a discarded map on its own task; each close
/// waits for the extension's in-flight calls to return.
fn close_mappings(mappings: RealmMap) {
    for mapping in mappings.into_values() {
        let extension = Arc::clone(&mapping.extension);
        tokio::spawn(async move {
            extension.close().await;
        });
    }
}
