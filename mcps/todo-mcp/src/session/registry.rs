//! Process-wide table of live sessions
//!
//! The registry is the single owner of every [`Session`]. Creation,
//! activation and every termination path go through it, so a closed session
//! can never remain resolvable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::state::{CloseReason, Session, SessionStatus};

/// Called once for every session that closes, after it left the registry
pub type CloseHook = Box<dyn Fn(&Session, CloseReason) + Send + Sync>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    close_hooks: Vec<CloseHook>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_close_hook(
        mut self,
        hook: impl Fn(&Session, CloseReason) + Send + Sync + 'static,
    ) -> Self {
        self.close_hooks.push(Box::new(hook));
        self
    }

    /// Insert a fresh uninitialized session under a new unique id
    pub fn create(&self) -> Arc<Session> {
        let mut sessions = self.sessions.lock();
        let mut id = uuid::Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = uuid::Uuid::new_v4().to_string();
        }
        let session = Arc::new(Session::new(id.clone()));
        sessions.insert(id, session.clone());
        tracing::debug!(session_id = %session.id(), "Session created");
        session
    }

    /// Make a created session resolvable by clients
    pub fn activate(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.lookup(id)?;
        if !session.activate() {
            return None;
        }
        tracing::info!(session_id = %id, "Session initialized");
        Some(session)
    }

    /// Create, prepare and activate a session in one step.
    ///
    /// A session that fails to activate is removed again before returning.
    pub fn open(&self, prepare: impl FnOnce(&Session)) -> Option<Arc<Session>> {
        let session = self.create();
        prepare(&session);
        let activated = self.activate(session.id());
        if activated.is_none() {
            self.remove(session.id());
            tracing::warn!(session_id = %session.id(), "Session failed to activate");
        }
        activated
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn lookup_active(&self, id: &str) -> Option<Arc<Session>> {
        self.lookup(id)
            .filter(|session| session.status() == SessionStatus::Active)
    }

    /// Drop the entry without closing it. No-op for unknown ids.
    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().remove(id)
    }

    /// Remove, close and run close hooks. Idempotent.
    pub fn terminate(&self, id: &str, reason: CloseReason) -> bool {
        match self.remove(id) {
            Some(session) => self.finish(&session, reason),
            None => false,
        }
    }

    fn finish(&self, session: &Session, reason: CloseReason) -> bool {
        if !session.close() {
            return false;
        }
        let client = session.client_info().map(|c| c.name).unwrap_or_default();
        tracing::info!(
            session_id = %session.id(),
            reason = %reason,
            client = %client,
            protocol_version = session.protocol_version().as_deref().unwrap_or("-"),
            lifetime_secs = (Utc::now() - session.created_at()).num_seconds(),
            "Session closed"
        );
        for hook in &self.close_hooks {
            hook(session, reason);
        }
        true
    }

    /// Close every session that has been idle for at least `timeout`
    pub fn sweep_idle(&self, timeout: Duration) -> Vec<String> {
        let idle: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock();
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_idle(timeout))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        idle.into_iter()
            .filter(|session| self.finish(session, CloseReason::IdleTimeout))
            .map(|session| session.id().to_string())
            .collect()
    }

    /// Close everything, used at shutdown
    pub fn close_all(&self, reason: CloseReason) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        drained
            .iter()
            .filter(|session| self.finish(session, reason))
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Periodically evict idle sessions
pub fn spawn_idle_sweeper(registry: Arc<SessionRegistry>, timeout: Duration) -> JoinHandle<()> {
    let period = (timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = registry.sweep_idle(timeout);
            if !evicted.is_empty() {
                tracing::info!(count = evicted.len(), "Evicted idle sessions");
            }
        }
    })
}
