//! Session lifecycle: the id → session map, the latest pointer, and the
//! auto-id minter.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use llmfs_domain::config::ConfigStore;

use crate::session::Session;

/// Virtual directory name aliasing the most recently used session. Never a
/// stored id; resolved on every access.
pub const LATEST_ALIAS: &str = "latest";

/// First id handed out by the auto-minter.
const AUTO_ID_FLOOR: u64 = 1000;

/// Owner of every live session.
///
/// One lock covers the map, the latest pointer, and the minter counter.
/// Lookups clone the `Arc`, so callers operate on the session after the
/// store lock is released, even one another thread has since removed.
pub struct SessionStore {
    config: Arc<ConfigStore>,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    sessions: HashMap<String, Arc<Session>>,
    latest_id: String,
    next_auto_id: u64,
}

impl SessionStore {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            inner: Mutex::new(StoreInner {
                sessions: HashMap::new(),
                latest_id: String::new(),
                next_auto_id: AUTO_ID_FLOOR,
            }),
        }
    }

    /// Create a session under a caller-chosen id.
    ///
    /// Returns `None` when the id is already live, empty, or the reserved
    /// `latest` alias.
    pub fn create(&self, id: &str) -> Option<Arc<Session>> {
        if id.is_empty() || id == LATEST_ALIAS {
            return None;
        }

        let mut inner = self.inner.lock();
        if inner.sessions.contains_key(id) {
            return None;
        }
        let session = Arc::new(Session::new(id, self.config.default_model()));
        inner.sessions.insert(id.to_owned(), session.clone());
        tracing::info!(session = %id, "session created");
        Some(session)
    }

    /// Create a session under a freshly minted numeric id.
    ///
    /// The counter is monotonic; an id a user already claimed by hand is
    /// skipped, so the loop always terminates with a unique session.
    pub fn create_with_auto_id(&self) -> Arc<Session> {
        let mut inner = self.inner.lock();
        loop {
            let id = inner.next_auto_id.to_string();
            inner.next_auto_id += 1;
            if inner.sessions.contains_key(&id) {
                continue;
            }
            let session = Arc::new(Session::new(&id, self.config.default_model()));
            inner.sessions.insert(id, session.clone());
            tracing::info!(session = %session.id(), "session minted");
            return session;
        }
    }

    /// Remove a session. Clears the latest pointer iff it named this id.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.latest_id == id {
            inner.latest_id.clear();
        }
        let removed = inner.sessions.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "session removed");
        }
        removed
    }

    /// Look up a session by its stored id (no alias handling).
    pub fn find(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.lock().sessions.get(id).cloned()
    }

    /// Look up a session, mapping the `latest` alias through the latest
    /// pointer first.
    pub fn resolve(&self, id: &str) -> Option<Arc<Session>> {
        let inner = self.inner.lock();
        if id == LATEST_ALIAS {
            if inner.latest_id.is_empty() {
                return None;
            }
            return inner.sessions.get(&inner.latest_id).cloned();
        }
        inner.sessions.get(id).cloned()
    }

    /// All live session ids, sorted for stable directory listings.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock().sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The latest pointer, if set.
    pub fn latest_id(&self) -> Option<String> {
        let inner = self.inner.lock();
        if inner.latest_id.is_empty() {
            None
        } else {
            Some(inner.latest_id.clone())
        }
    }

    pub fn set_latest(&self, id: &str) {
        self.inner.lock().latest_id = id.to_owned();
    }
}
