//! Session Store (C3) — thin async layer over the SQLite-backed key/value
//! store.
//!
//! All operations fail with [`StoreError`] on underlying I/O failure; per
//! §7 it is the *caller's* job to log and degrade (return `None`/`false`)
//! rather than let a `StoreError` reach the UI channel. This crate only
//! ever returns `Result`, it never degrades on its own.

mod storage;

use shared_types::session::Session;
use shared_types::{SessionId, StoreError};
use storage::Storage;

/// Async handle to the session store. Cheap to clone; the underlying
/// connection is behind an `Arc<Mutex<_>>` and every operation hops to a
/// blocking task, the same bridging pattern the session manager uses for
/// rusqlite.
#[derive(Clone)]
pub struct SessionStore {
    storage: Storage,
}

impl SessionStore {
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        let path = db_path.to_string();
        let storage = tokio::task::spawn_blocking(move || Storage::open(&path))
            .await
            .map_err(|e| StoreError::Io(format!("storage task panicked: {e}")))??;
        Ok(Self { storage })
    }

    pub async fn fetch_all(&self) -> Result<Vec<Session>, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.fetch_all())
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn fetch_by_id(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.fetch_by_id(id))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    /// Per the design decision not to persist `window_id` (§6 open
    /// question 3), no row ever carries one: this always returns `None`.
    /// Kept so the interface mirrors §4.3's operation list exactly; the
    /// engine's actual window-lookup path is `Registry::get_by_window`.
    pub async fn fetch_by_window_id(&self, _wid: i64) -> Result<Option<Session>, StoreError> {
        Ok(None)
    }

    pub async fn fetch_by_name(&self, name: &str) -> Result<Option<Session>, StoreError> {
        let storage = self.storage.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || storage.fetch_by_name(&name))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn create(&self, draft: Session) -> Result<Session, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.create(&draft))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn update(&self, session: Session) -> Result<Session, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.update(&session))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn remove(&self, id: SessionId) -> Result<bool, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.remove(id))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    /// Supplements §4.3's CRUD list (see SPEC_FULL §F.3): list `(id,
    /// last_access)` pairs, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<(SessionId, i64)>, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.list_sessions())
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    /// Bound storage growth by keeping only the `keep_count` most recently
    /// accessed sessions. An internal maintenance hook, not a wire message.
    pub async fn cleanup_old_sessions(&self, keep_count: usize) -> Result<usize, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.cleanup_old_sessions(keep_count))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn get_extension_version(&self) -> Result<Option<String>, StoreError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.get_extension_version())
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    pub async fn set_extension_version(&self, version: &str) -> Result<(), StoreError> {
        let storage = self.storage.clone();
        let version = version.to_string();
        tokio::task::spawn_blocking(move || storage.set_extension_version(&version))
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?
    }

    /// Export a session to pretty-printed JSON (SPEC_FULL §F.2).
    pub async fn export_session(&self, id: SessionId) -> Result<String, StoreError> {
        let session = self
            .fetch_by_id(id)
            .await?
            .ok_or(StoreError::NotFound(id.0))?;
        serde_json::to_string_pretty(&session).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Import a session previously produced by [`Self::export_session`] or
    /// [`crate::SessionStore::export_session`]'s wire equivalent
    /// (`restore_from_backup`); assigns a fresh id.
    pub async fn import_session(&self, json: &str) -> Result<Session, StoreError> {
        let mut draft: Session =
            serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))?;
        draft.id = None;
        self.create(draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::tab::Tab;

    async fn temp_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SessionStore::open(path.to_str().unwrap()).await.unwrap();
        (store, dir)
    }

    fn draft(name: &str) -> Session {
        Session {
            id: None,
            name: Some(name.to_string()),
            session_hash: 7,
            tabs: vec![Tab::from_url("https://example.com")],
            history: vec![],
            last_access: 1,
            window_bounds: None,
            window_id: None,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let (store, _dir) = temp_store().await;
        let saved = store.create(draft("work")).await.unwrap();
        let fetched = store.fetch_by_id(saved.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.name.as_deref(), Some("work"));
    }

    #[tokio::test]
    async fn export_then_import_round_trips_tabs() {
        let (store, _dir) = temp_store().await;
        let saved = store.create(draft("work")).await.unwrap();
        let json = store.export_session(saved.id.unwrap()).await.unwrap();
        let imported = store.import_session(&json).await.unwrap();
        assert_ne!(imported.id, saved.id);
        assert_eq!(imported.tabs, saved.tabs);
    }

    #[tokio::test]
    async fn fetch_by_window_id_always_none() {
        let (store, _dir) = temp_store().await;
        store.create(draft("work")).await.unwrap();
        assert!(store.fetch_by_window_id(1).await.unwrap().is_none());
    }
}
