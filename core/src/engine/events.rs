//! Engine event publication.
//!
//! Subscribers (the cluster sync adapter, tests, audit hooks) receive
//! events over a broadcast channel. Sending never runs subscriber code —
//! receivers drain on their own tasks — so the engine can schedule events
//! inside its critical section and still satisfy the rule that callbacks
//! never execute under the engine lock.
//!
//! Eviction-driven lock-released events go through
//! [`EventSink::emit_if_enabled`], which a scoped [`SuppressGuard`]
//! silences while bulk cache flushes run.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Events raised by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A credential was accepted and cached for `ttl`
    Authenticated {
        realm: String,
        account: String,
        password: String,
        ttl: Duration,
    },
    /// An account transitioned into (`locked = true`) or out of
    /// (`locked = false`, `ttl` zero) the locked state
    LockStatusChanged {
        realm: String,
        account: String,
        locked: bool,
        ttl: Duration,
    },
}

/// Broadcast fan-out with a scoped report-enable toggle
#[derive(Debug)]
pub struct EventSink {
    tx: broadcast::Sender<EngineEvent>,
    report_enabled: AtomicBool,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            report_enabled: AtomicBool::new(true),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; a send without subscribers is not an error
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn emit_all(&self, events: Vec<EngineEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Publish unless a [`SuppressGuard`] is active. Used by the negative
    /// cache eviction hook so bulk flushes do not raise unlock storms.
    pub fn emit_if_enabled(&self, event: EngineEvent) {
        if self.report_enabled.load(Ordering::SeqCst) {
            self.emit(event);
        }
    }

    /// Disable eviction-driven reporting for the guard's lifetime
    pub fn suppressed(&self) -> SuppressGuard<'_> {
        self.report_enabled.store(false, Ordering::SeqCst);
        SuppressGuard { sink: self }
    }

    pub fn reporting_enabled(&self) -> bool {
        self.report_enabled.load(Ordering::SeqCst)
    }
}

/// RAII guard restoring eviction-driven reporting on drop
pub struct SuppressGuard<'a> {
    sink: &'a EventSink,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.sink.report_enabled.store(true, Ordering::SeqCst);
    }
}
