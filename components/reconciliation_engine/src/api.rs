//! Public mutation API (§4.5.8): the operations the UI-control wire
//! messages ultimately call through to.

use crate::types::now;
use crate::{ReconcileError, ReconciliationEngine};
use session_hash::session_hash;
use shared_types::ids::{SessionId, WindowId};
use shared_types::session::Session;
use shared_types::tab::{Tab, WindowBounds};
use std::sync::Arc;
use tracing::debug;

impl ReconciliationEngine {
    fn hash_of(&self, tabs: &[Tab]) -> u32 {
        session_hash(tabs.iter().map(|t| t.url.as_str()), &self.config.extension_id)
    }

    async fn check_name_available(&self, name: &str, excluding: Option<SessionId>) -> Result<(), ReconcileError> {
        if let Some(existing) = self.store.fetch_by_name(name).await? {
            if existing.id != excluding {
                return Err(ReconcileError::NameConflict(name.to_string()));
            }
        }
        Ok(())
    }

    /// The authoritative tab list for `wid` right now: queries the platform
    /// directly rather than the registry's last-matched copy, since the
    /// registry can still be empty immediately after `ensure_initialized`
    /// and before the first debounce cycle populates it. Falls back to
    /// whatever the registry has bound if the platform handle is stale.
    pub async fn live_tabs(&self, wid: WindowId) -> Vec<Tab> {
        if let Some(window) = self.platform.get_window(wid).await {
            return window.tabs;
        }
        self.registry
            .get_by_window(wid)
            .await
            .ok()
            .flatten()
            .map(|s| s.tabs)
            .unwrap_or_default()
    }

    /// Persist a brand-new durable session from caller-supplied `tabs` (and
    /// optional `bounds`), binding it to `wid` if given (§4.5.8). If `wid`
    /// is already bound to a *durable* session, reject outright rather than
    /// clobber it (§8 "For any `save_new_session` given a window already
    /// bound to a durable session, the operation fails and no registry
    /// change occurs"); a temporary binding at `wid` is simply replaced.
    pub async fn save_new_session(
        self: &Arc<Self>,
        name: String,
        tabs: Vec<Tab>,
        wid: Option<WindowId>,
        bounds: Option<WindowBounds>,
    ) -> Result<Session, ReconcileError> {
        self.check_name_available(&name, None).await?;

        if let Some(wid) = wid {
            let current = self.registry.get_by_window(wid).await?;
            if current.as_ref().map(|s| !s.is_temporary()).unwrap_or(false) {
                self.metrics.record_invariant_rejection();
                return Err(ReconcileError::InvariantViolation(wid.0));
            }
        }

        let draft = Session {
            id: None,
            name: Some(name),
            session_hash: self.hash_of(&tabs),
            tabs,
            history: Vec::new(),
            last_access: now(),
            window_bounds: bounds,
            window_id: None,
        };
        let persisted = self.store.create(draft).await?;

        let Some(wid) = wid else { return Ok(persisted) };

        self.unbind_window(wid).await?;
        let mut bound = persisted.clone();
        bound.window_id = Some(wid);
        if !self.registry.add_safely(bound) {
            self.metrics.record_invariant_rejection();
            debug!(window_id = wid.0, "race: window bound concurrently, adopting the winner");
            if let Some(winner) = self.registry.get_by_window(wid).await? {
                return Ok(winner);
            }
        }
        self.metrics.record_bind();

        Ok(persisted)
    }

    /// Rename a durable session, rejecting a case-insensitive collision
    /// with any other session (invariant 4).
    pub async fn update_session_name(&self, id: SessionId, new_name: String) -> Result<Session, ReconcileError> {
        self.check_name_available(&new_name, Some(id)).await?;

        let mut session = self
            .store
            .fetch_by_id(id)
            .await?
            .ok_or(ReconcileError::InvariantViolation(id.0))?;
        session.name = Some(new_name);
        let saved = self.store.update(session).await?;
        Ok(self.registry.apply_update(saved))
    }

    /// Overwrite an existing durable session's tabs with the live window's
    /// current tabs, then bind that window to it (§4.5.8).
    pub async fn save_existing_session(self: &Arc<Self>, wid: WindowId, id: SessionId) -> Result<Session, ReconcileError> {
        let mut session = self
            .store
            .fetch_by_id(id)
            .await?
            .ok_or(ReconcileError::InvariantViolation(id.0))?;

        if let Some(window) = self.platform.get_window(wid).await {
            session.tabs = window.tabs;
        }
        session.session_hash = self.hash_of(&session.tabs);
        session.last_access = now();
        let saved = self.store.update(session).await?;

        self.bind(saved.clone(), wid).await?;
        Ok(saved)
    }

    /// Delete a durable session. If it is currently bound to a live
    /// window, that window falls back to a fresh temporary session rather
    /// than being left unbound.
    pub async fn delete_session(self: &Arc<Self>, id: SessionId) -> Result<(), ReconcileError> {
        let bound_window = self.registry.get_by_id(id).and_then(|s| s.window_id);

        self.registry.remove_by_id(id);
        self.store.remove(id).await?;

        if let Some(wid) = bound_window {
            if let Some(window) = self.platform.get_window(wid).await {
                self.ensure_session(wid, &window.tabs).await?;
            }
        }
        Ok(())
    }

    /// Replace a durable session's tabs without requiring a live window
    /// (e.g. manual edit from the UI).
    pub async fn update_session_tabs(&self, id: SessionId, tabs: Vec<Tab>) -> Result<Session, ReconcileError> {
        let mut session = self
            .store
            .fetch_by_id(id)
            .await?
            .ok_or(ReconcileError::InvariantViolation(id.0))?;
        session.tabs = tabs;
        session.session_hash = self.hash_of(&session.tabs);
        session.truncate_history();
        let saved = self.store.update(session).await?;
        Ok(self.registry.apply_update(saved))
    }

    /// Restore a previously exported session (§F.2): assigns a fresh id,
    /// leaves it unbound until a window claims it via matching.
    pub async fn restore_from_backup(&self, json: &str) -> Result<Session, ReconcileError> {
        let restored = self.store.import_session(json).await?;
        self.registry.add_safely(restored.clone());
        Ok(restored)
    }

    /// Create a brand-new durable session from a tab list with no
    /// associated live window (e.g. imported from another profile). An
    /// absent name is allowed — unnamed sessions never collide on name.
    pub async fn import_new_session(&self, name: Option<String>, tabs: Vec<Tab>) -> Result<Session, ReconcileError> {
        if let Some(n) = &name {
            self.check_name_available(n, None).await?;
        }

        let draft = Session {
            id: None,
            name,
            session_hash: self.hash_of(&tabs),
            tabs,
            history: Vec::new(),
            last_access: now(),
            window_bounds: None,
            window_id: None,
        };
        let saved = self.store.create(draft).await?;
        if !self.registry.add_safely(saved.clone()) {
            self.metrics.record_invariant_rejection();
            debug!(session_id = saved.id.map(|i| i.0), "imported session id already present in registry");
        }
        Ok(saved)
    }

    /// Delete whatever durable session currently holds `name`, if any. Used
    /// by the `delete_old` flag on save/rename requests (§6). `excluding`
    /// must be the id of the session being saved/renamed itself: a
    /// case-only rename (e.g. "work" → "Work") finds its own row as the
    /// case-insensitive name holder, and must not delete it out from under
    /// the rename that's about to persist it (spec.md:201's "same-id case
    /// is allowed without arbitration").
    pub async fn delete_session_by_name(
        self: &Arc<Self>,
        name: &str,
        excluding: Option<SessionId>,
    ) -> Result<(), ReconcileError> {
        if let Some(existing) = self.store.fetch_by_name(name).await? {
            if existing.id == excluding {
                return Ok(());
            }
            if let Some(id) = existing.id {
                self.delete_session(id).await?;
            }
        }
        Ok(())
    }

    /// Restore a space directly from its wire shape (`SpaceView`), as
    /// opposed to [`Self::restore_from_backup`]'s store-native JSON.
    pub async fn restore_space_from_view(
        self: &Arc<Self>,
        name: Option<String>,
        tabs: Vec<Tab>,
        history: Vec<Tab>,
        delete_old: bool,
    ) -> Result<Session, ReconcileError> {
        if delete_old {
            if let Some(n) = &name {
                self.delete_session_by_name(n, None).await?;
            }
        }
        let draft = Session {
            id: None,
            name,
            session_hash: self.hash_of(&tabs),
            tabs,
            history,
            last_access: now(),
            window_bounds: None,
            window_id: None,
        };
        let saved = self.store.create(draft).await?;
        self.registry.add_safely(saved.clone());
        Ok(saved)
    }

    /// Remove `tab_id`'s tab from wherever it currently lives and append it
    /// to the durable session `sid`'s tabs.
    pub async fn move_tab_to_session(&self, tab_id: shared_types::ids::TabId, sid: SessionId) -> Result<Session, ReconcileError> {
        let moved_tab = self.take_tab_from_any_session(tab_id).await?;
        self.append_tab_to_session(sid, moved_tab).await
    }

    /// Append a fresh tab for `url` to the durable session `sid`'s tabs.
    pub async fn add_link_to_session(&self, url: String, sid: SessionId) -> Result<Session, ReconcileError> {
        self.append_tab_to_session(sid, Tab::from_url(url)).await
    }

    /// Remove `tab_id`'s tab from wherever it currently lives and append it
    /// to whatever durable session is bound to `wid`.
    pub async fn move_tab_to_window(&self, tab_id: shared_types::ids::TabId, wid: WindowId) -> Result<Session, ReconcileError> {
        let moved_tab = self.take_tab_from_any_session(tab_id).await?;
        let sid = self
            .registry
            .get_by_window(wid)
            .await?
            .and_then(|s| s.id)
            .ok_or(ReconcileError::InvariantViolation(wid.0))?;
        self.append_tab_to_session(sid, moved_tab).await
    }

    /// Append a fresh tab for `url` to whatever durable session is bound to
    /// `wid`.
    pub async fn add_link_to_window(&self, url: String, wid: WindowId) -> Result<Session, ReconcileError> {
        let sid = self
            .registry
            .get_by_window(wid)
            .await?
            .and_then(|s| s.id)
            .ok_or(ReconcileError::InvariantViolation(wid.0))?;
        self.append_tab_to_session(sid, Tab::from_url(url)).await
    }

    /// Remove `tab_id`'s tab from wherever it currently lives and use it to
    /// found a brand-new durable session named `name`.
    pub async fn move_tab_to_new_session(&self, tab_id: shared_types::ids::TabId, name: String) -> Result<Session, ReconcileError> {
        let moved_tab = self.take_tab_from_any_session(tab_id).await?;
        self.import_new_session(Some(name), vec![moved_tab]).await
    }

    /// Found a brand-new durable session named `name` containing a single
    /// tab for `url`.
    pub async fn add_link_to_new_session(&self, url: String, name: String) -> Result<Session, ReconcileError> {
        self.import_new_session(Some(name), vec![Tab::from_url(url)]).await
    }

    /// Locate `tab_id` across every durable session, splice it out of
    /// whichever one holds it, and return the removed tab.
    async fn take_tab_from_any_session(&self, tab_id: shared_types::ids::TabId) -> Result<Tab, ReconcileError> {
        for mut session in self.store.fetch_all().await? {
            if let Some(pos) = session.tabs.iter().position(|t| t.id == Some(tab_id)) {
                let tab = session.tabs.remove(pos);
                session.session_hash = self.hash_of(&session.tabs);
                let id = session.id;
                let saved = self.store.update(session).await?;
                if id.is_some() {
                    self.registry.apply_update(saved);
                }
                return Ok(tab);
            }
        }
        Err(ReconcileError::InvariantViolation(tab_id.0))
    }

    async fn append_tab_to_session(&self, sid: SessionId, tab: Tab) -> Result<Session, ReconcileError> {
        let mut session = self
            .store
            .fetch_by_id(sid)
            .await?
            .ok_or(ReconcileError::InvariantViolation(sid.0))?;
        session.tabs.push(tab);
        session.session_hash = self.hash_of(&session.tabs);
        let saved = self.store.update(session).await?;
        Ok(self.registry.apply_update(saved))
    }

    /// Every known session with at least one tab (§6 "Filter out sessions
    /// with zero tabs"), open ones (bound to a live window) first, then
    /// closed ones, each group ordered by descending `last_access` (§6
    /// `request_all_spaces` sort order). `bulk_load` seeds the registry with
    /// every persisted session regardless of binding, so the split has to
    /// go by `window_id`, not by which of registry/store a session came
    /// from.
    pub async fn list_all_spaces(&self) -> Result<Vec<Session>, ReconcileError> {
        let mut open = Vec::new();
        let mut closed = Vec::new();
        let mut seen_ids = std::collections::HashSet::new();

        for session in self.registry.get_all() {
            seen_ids.extend(session.id);
            if session.tabs.is_empty() {
                continue;
            }
            if session.window_id.is_some() {
                open.push(session);
            } else {
                closed.push(session);
            }
        }

        for session in self.store.fetch_all().await? {
            if session.id.map(|id| seen_ids.contains(&id)).unwrap_or(false) {
                continue;
            }
            if session.tabs.is_empty() {
                continue;
            }
            closed.push(session);
        }

        open.sort_by(|a, b| b.last_access.cmp(&a.last_access));
        closed.sort_by(|a, b| b.last_access.cmp(&a.last_access));
        open.extend(closed);
        Ok(open)
    }
}
