//! Session Registry (C4) — the in-memory authoritative mirror of sessions.
//!
//! Holds an insertion-ordered list plus by-id/by-window indices so lookups
//! and duplicate-binding checks are O(1); `remove_by_id` still does the
//! O(n) splice the spec calls for (list order matters for
//! `request_all_spaces`'s sort, so there's no avoiding a shift on removal).

use parking_lot::Mutex;
use session_store::SessionStore;
use shared_types::ids::{SessionId, WindowId};
use shared_types::session::Session;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store error: {0}")]
    Store(#[from] shared_types::StoreError),
}

struct Inner {
    sessions: Vec<Session>,
    by_id: HashMap<SessionId, usize>,
    by_window: HashMap<WindowId, usize>,
    initialized: bool,
}

impl Inner {
    fn empty() -> Self {
        Self {
            sessions: Vec::new(),
            by_id: HashMap::new(),
            by_window: HashMap::new(),
            initialized: false,
        }
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_window.clear();
        for (i, s) in self.sessions.iter().enumerate() {
            if let Some(id) = s.id {
                self.by_id.insert(id, i);
            }
            if let Some(wid) = s.window_id {
                self.by_window.insert(wid, i);
            }
        }
    }
}

pub struct Registry {
    store: SessionStore,
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new(store: SessionStore) -> Self {
        Self { store, inner: Mutex::new(Inner::empty()) }
    }

    /// Replace the registry's contents wholesale. Called once during
    /// initialization (§4.5.2 step 2) with everything fetched from the
    /// store.
    pub fn bulk_load(&self, sessions: Vec<Session>) {
        let mut inner = self.inner.lock();
        inner.sessions = sessions;
        inner.initialized = true;
        inner.reindex();
    }

    /// `get_by_window(wid)` — first checks memory; if initialized and not
    /// found, falls back to the store (§4.4). In this implementation the
    /// store never has a window-id column to fall back to (design
    /// decision on `window_id` persistence), so the fallback always misses
    /// — the call is kept for interface fidelity with §4.4's description.
    pub async fn get_by_window(&self, wid: WindowId) -> Result<Option<Session>, RegistryError> {
        let from_memory = {
            let inner = self.inner.lock();
            inner.by_window.get(&wid).map(|&i| inner.sessions[i].clone())
        };
        if from_memory.is_some() {
            return Ok(from_memory);
        }

        let initialized = self.inner.lock().initialized;
        if !initialized {
            return Ok(None);
        }

        Ok(self.store.fetch_by_window_id(wid.0).await?)
    }

    pub fn get_by_id(&self, id: SessionId) -> Option<Session> {
        let inner = self.inner.lock();
        inner.by_id.get(&id).map(|&i| inner.sessions[i].clone())
    }

    /// Shallow copy of every session currently held, in insertion order.
    pub fn get_all(&self) -> Vec<Session> {
        self.inner.lock().sessions.clone()
    }

    /// Reject if another entry shares the same `id` (if present) or the
    /// same `window_id` (if present). Returns whether the session was
    /// added.
    pub fn add_safely(&self, session: Session) -> bool {
        let mut inner = self.inner.lock();

        if let Some(id) = session.id {
            if inner.by_id.contains_key(&id) {
                error!(session_id = id.0, "refusing to add duplicate session id to registry");
                return false;
            }
        }
        if let Some(wid) = session.window_id {
            if inner.by_window.contains_key(&wid) {
                debug!(window_id = wid.0, "refusing to add duplicate window binding to registry");
                return false;
            }
        }

        let idx = inner.sessions.len();
        if let Some(id) = session.id {
            inner.by_id.insert(id, idx);
        }
        if let Some(wid) = session.window_id {
            inner.by_window.insert(wid, idx);
        }
        inner.sessions.push(session);
        true
    }

    /// O(n) splice, per §4.4.
    pub fn remove_by_id(&self, id: SessionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.id != Some(id));
        let removed = inner.sessions.len() != before;
        if removed {
            inner.reindex();
        }
        removed
    }

    /// Splice out the entry currently bound to `wid`, if any (used for
    /// temporary sessions in `bind`/window-removal paths where there's no
    /// durable id to key on).
    pub fn remove_by_window(&self, wid: WindowId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.window_id != Some(wid));
        let removed = inner.sessions.len() != before;
        if removed {
            inner.reindex();
        }
        removed
    }

    /// Reference-preserving update: patch the matching entry's fields in
    /// place so other holders of the same id see the new data on their
    /// next lookup, rather than a stale clone (§4.4). If no matching entry
    /// exists, logs a warning and returns `updated` uncached.
    pub fn apply_update(&self, updated: Session) -> Session {
        let Some(id) = updated.id else { return updated };
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.by_id.get(&id) {
            inner.sessions[idx] = updated.clone();
            updated
        } else {
            warn!(session_id = id.0, "update for session not present in registry; returning uncached");
            updated
        }
    }

    /// Set (or clear) the in-memory `window_id` for the entry with `id`,
    /// without touching the store. Used by `bind` and window-removal.
    pub fn set_window_id(&self, id: SessionId, window_id: Option<WindowId>) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.by_id.get(&id) {
            if let Some(old) = inner.sessions[idx].window_id {
                inner.by_window.remove(&old);
            }
            inner.sessions[idx].window_id = window_id;
            if let Some(wid) = window_id {
                inner.by_window.insert(wid, idx);
            }
        }
    }

    pub fn set_last_access(&self, id: SessionId, last_access: i64) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.by_id.get(&id) {
            inner.sessions[idx].last_access = last_access;
        }
    }

    /// Same as `set_last_access`, keyed by window instead of id — used for
    /// temporary sessions, which have no id to key on.
    pub fn set_last_access_by_window(&self, wid: WindowId, last_access: i64) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.by_window.get(&wid) {
            inner.sessions[idx].last_access = last_access;
        }
    }

    pub fn set_window_bounds(&self, id: SessionId, bounds: shared_types::tab::WindowBounds) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.by_id.get(&id) {
            inner.sessions[idx].window_bounds = Some(bounds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::tab::Tab;

    async fn registry() -> (Registry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SessionStore::open(path.to_str().unwrap()).await.unwrap();
        (Registry::new(store), dir)
    }

    fn temp_session(wid: Option<i64>) -> Session {
        Session {
            id: None,
            name: None,
            session_hash: 0,
            tabs: vec![Tab::from_url("https://x.test")],
            history: vec![],
            last_access: 0,
            window_bounds: None,
            window_id: wid.map(WindowId),
        }
    }

    #[tokio::test]
    async fn add_safely_rejects_duplicate_window_id() {
        let (reg, _dir) = registry().await;
        assert!(reg.add_safely(temp_session(Some(1))));
        assert!(!reg.add_safely(temp_session(Some(1))));
        assert_eq!(reg.get_all().len(), 1);
    }

    #[tokio::test]
    async fn add_safely_rejects_duplicate_id() {
        let (reg, _dir) = registry().await;
        let mut s = temp_session(Some(1));
        s.id = Some(SessionId(5));
        assert!(reg.add_safely(s.clone()));
        let mut dup = temp_session(Some(2));
        dup.id = Some(SessionId(5));
        assert!(!reg.add_safely(dup));
    }

    #[tokio::test]
    async fn get_by_window_finds_in_memory_entry() {
        let (reg, _dir) = registry().await;
        reg.add_safely(temp_session(Some(3)));
        let found = reg.get_by_window(WindowId(3)).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn remove_by_id_splices_entry() {
        let (reg, _dir) = registry().await;
        let mut s = temp_session(Some(1));
        s.id = Some(SessionId(9));
        reg.add_safely(s);
        assert!(reg.remove_by_id(SessionId(9)));
        assert_eq!(reg.get_all().len(), 0);
    }

    #[tokio::test]
    async fn apply_update_patches_in_place() {
        let (reg, _dir) = registry().await;
        let mut s = temp_session(Some(1));
        s.id = Some(SessionId(1));
        reg.add_safely(s.clone());

        let mut updated = s.clone();
        updated.session_hash = 123;
        reg.apply_update(updated);

        let fetched = reg.get_by_id(SessionId(1)).unwrap();
        assert_eq!(fetched.session_hash, 123);
    }

    #[tokio::test]
    async fn set_window_id_moves_binding() {
        let (reg, _dir) = registry().await;
        let mut s = temp_session(Some(1));
        s.id = Some(SessionId(1));
        reg.add_safely(s);

        reg.set_window_id(SessionId(1), Some(WindowId(2)));
        assert!(reg.get_by_window(WindowId(2)).await.unwrap().is_some());
        assert!(reg.get_by_window(WindowId(1)).await.unwrap().is_none());
    }
}
