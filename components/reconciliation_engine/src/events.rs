//! Event handlers, the 1-second debounce, window removal, and bounds
//! capture (§4.5.4-4.5.7).

use crate::types::{now, HistoryAction, HistoryQueueEntry, PlatformEvent};
use crate::ReconcileError;
use crate::ReconciliationEngine;
use platform_abstraction::WindowType;
use shared_types::ids::WindowId;
use shared_types::session::Session;
use shared_types::tab::WindowBounds;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url_normalizer::clean_url;

impl ReconciliationEngine {
    /// Top-level dispatch. Guarded by the closed set (§4.5.4): any event
    /// naming a closed window is discarded, except a window-closing
    /// tab-removed, which is redirected to `handle_window_removed`.
    pub async fn handle_event(self: &Arc<Self>, event: PlatformEvent) -> Result<(), ReconcileError> {
        self.ensure_initialized().await?;

        let wid = event.window_id();
        let is_closing_removal = matches!(
            event,
            PlatformEvent::TabRemoved { is_window_closing: true, .. }
        );

        if self.closed_window_ids.lock().contains(&wid) && !is_closing_removal {
            debug!(window_id = wid.0, "discarding event for closed window");
            return Ok(());
        }

        match event {
            PlatformEvent::TabCreated { .. } => Ok(()),

            PlatformEvent::TabUpdated { tab, window_id, status_complete, changed_url } => {
                if status_complete {
                    if let Some(tab_id) = tab.id {
                        self.tab_history_url_map.lock().insert(tab_id, tab.url.clone());
                    }
                    self.enqueue_window_event(window_id);
                }
                if let Some(url) = changed_url {
                    self.history_queue.lock().push_back(HistoryQueueEntry {
                        url,
                        window_id,
                        action: HistoryAction::Remove,
                    });
                }
                Ok(())
            }

            PlatformEvent::TabRemoved { tab_id, window_id, is_window_closing } => {
                if is_window_closing {
                    return self.handle_window_removed(window_id, true).await;
                }
                let url = self.tab_history_url_map.lock().remove(&tab_id);
                if let Some(url) = url {
                    self.history_queue.lock().push_back(HistoryQueueEntry {
                        url,
                        window_id,
                        action: HistoryAction::Add,
                    });
                }
                self.enqueue_window_event(window_id);
                Ok(())
            }

            PlatformEvent::TabMoved { window_id } => {
                self.enqueue_window_event(window_id);
                Ok(())
            }

            PlatformEvent::WindowFocusChanged { window_id } => {
                if !window_id.is_valid() {
                    return Ok(());
                }
                if let Some(session) = self.registry.get_by_window(window_id).await? {
                    match session.id {
                        Some(id) => self.registry.set_last_access(id, now()),
                        None => self.registry.set_last_access_by_window(window_id, now()),
                    }
                }
                Ok(())
            }

            PlatformEvent::WindowRemoved { window_id } => {
                self.handle_window_removed(window_id, true).await
            }

            PlatformEvent::WindowBoundsChanged { window_id, bounds } => {
                self.capture_window_bounds(window_id, bounds).await;
                Ok(())
            }
        }
    }

    /// `enqueue_window_event` (§4.5.5): clears any existing timer for
    /// `wid`, counts the event, and schedules `handle_window_event` for
    /// +debounce_millis. Bursts collapse to one invocation per window.
    pub(crate) fn enqueue_window_event(self: &Arc<Self>, wid: WindowId) {
        self.event_queue_count.fetch_add(1, Ordering::Relaxed);

        let mut timers = self.session_update_timers.lock();
        if let Some(old) = timers.remove(&wid) {
            old.abort();
            self.metrics.record_debounce_coalescion();
        }

        let engine = Arc::clone(self);
        let debounce = Duration::from_millis(self.config.debounce_millis);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            engine.session_update_timers.lock().remove(&wid);
            if let Err(e) = engine.handle_window_event(wid).await {
                warn!(window_id = wid.0, error = %e, "window event handling failed");
            }
        });
        timers.insert(wid, handle);
    }

    /// The debounced handler itself (§4.5.5 steps 1-7).
    async fn handle_window_event(self: &Arc<Self>, wid: WindowId) -> Result<(), ReconcileError> {
        if !wid.is_valid() || self.closed_window_ids.lock().contains(&wid) {
            return Ok(());
        }

        let window = match self.platform.get_window(wid).await {
            Some(w) => w,
            None => {
                self.handle_window_removed(wid, false).await?;
                return Ok(());
            }
        };

        if filter_internal_windows(&window, &self.config.extension_id) {
            return Ok(());
        }

        let existing = self.registry.get_by_window(wid).await?;

        if let Some(mut session) = existing.clone() {
            self.drain_history_queue(&mut session, wid);
            session.tabs = window.tabs.clone();
            session.session_hash =
                session_hash::session_hash(session.tabs.iter().map(|t| t.url.as_str()), &self.config.extension_id);

            if session.id.is_some() {
                self.store.update(session.clone()).await?;
            }
            self.registry.apply_update(session);
        }

        if existing.is_none() || existing.as_ref().map(Session::is_temporary).unwrap_or(false) {
            self.ensure_session(wid, &window.tabs).await?;
        }

        Ok(())
    }

    /// Drain `history_queue` entries for `wid`, newest first (the queue is
    /// FIFO by arrival, so newest-first means draining from the back).
    fn drain_history_queue(&self, session: &mut Session, wid: WindowId) {
        let mut queue = self.history_queue.lock();
        let mut matched = Vec::new();
        let mut i = 0;
        while i < queue.len() {
            if queue[i].window_id == wid {
                matched.push(queue.remove(i).unwrap());
            } else {
                i += 1;
            }
        }
        drop(queue);

        for entry in matched.into_iter().rev() {
            match entry.action {
                HistoryAction::Add => self.add_url_to_session_history(session, &entry.url),
                HistoryAction::Remove => self.remove_url_from_session_history(session, &entry.url),
            }
        }
    }

    /// `add-url-to-session-history` (§4.5.5).
    fn add_url_to_session_history(&self, session: &mut Session, raw_url: &str) {
        let u = clean_url(raw_url, &self.config.extension_id);
        if u.is_empty() {
            return;
        }

        let matches: Vec<_> = session
            .tabs
            .iter()
            .filter(|t| clean_url(&t.url, &self.config.extension_id) == u)
            .cloned()
            .collect();
        if matches.len() != 1 {
            return;
        }

        session
            .history
            .retain(|t| clean_url(&t.url, &self.config.extension_id) != u);
        session.history.insert(0, matches.into_iter().next().unwrap());
        session.history.truncate(self.config.history_cap);
    }

    /// `remove-url-from-session-history` (§4.5.5).
    fn remove_url_from_session_history(&self, session: &mut Session, raw_url: &str) {
        let u = clean_url(raw_url, &self.config.extension_id);
        session
            .history
            .retain(|t| clean_url(&t.url, &self.config.extension_id) != u);
    }

    /// `handle_window_removed` (§4.5.6).
    pub async fn handle_window_removed(self: &Arc<Self>, wid: WindowId, mark_closed: bool) -> Result<(), ReconcileError> {
        if self.closed_window_ids.lock().contains(&wid) {
            debug!(window_id = wid.0, "duplicate window-removed event, ignoring");
            return Ok(());
        }

        if mark_closed {
            let mut closed = self.closed_window_ids.lock();
            closed.insert(wid);
            if closed.len() > self.config.max_closed_window_ids {
                warn!(
                    count = closed.len(),
                    cap = self.config.max_closed_window_ids,
                    "closed_window_ids exceeds configured cap (advisory only, never evicted)"
                );
            }
            drop(closed);

            if let Some(handle) = self.session_update_timers.lock().remove(&wid) {
                handle.abort();
            }
            if let Some(handle) = self.bounds_update_timers.lock().remove(&wid) {
                handle.abort();
            }
        }

        let session = self.registry.get_by_window(wid).await?;
        if let Some(session) = session {
            match session.id {
                Some(id) => {
                    self.registry.set_window_id(id, None);
                    if let Some(mut persisted) = self.registry.get_by_id(id) {
                        persisted.window_id = None;
                        self.store.update(persisted).await?;
                    }
                }
                None => {
                    self.registry.remove_by_window(wid);
                }
            }
        }

        Ok(())
    }

    /// `capture_window_bounds` (§4.5.7): requires a durable session bound
    /// to `wid`; no-op otherwise. Updates in memory immediately, then
    /// debounces the persisted write.
    pub async fn capture_window_bounds(self: &Arc<Self>, wid: WindowId, bounds: WindowBounds) {
        let Ok(Some(session)) = self.registry.get_by_window(wid).await else { return };
        let Some(id) = session.id else { return };

        self.registry.set_window_bounds(id, bounds);

        let mut timers = self.bounds_update_timers.lock();
        if let Some(old) = timers.remove(&wid) {
            old.abort();
        }

        let engine = Arc::clone(self);
        let debounce = Duration::from_millis(self.config.debounce_millis);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            engine.bounds_update_timers.lock().remove(&wid);
            if let Some(latest) = engine.registry.get_by_id(id) {
                if let Err(e) = engine.store.update(latest).await {
                    warn!(window_id = wid.0, error = %e, "bounds write failed");
                }
            }
        });
        timers.insert(wid, handle);
    }
}

/// `filter_internal_windows` (§4.5.5 step 3): a single tab whose URL
/// contains the extension id, or a non-normal window type, is "internal"
/// chrome rather than a user space.
pub(crate) fn filter_internal_windows(window: &platform_abstraction::PlatformWindow, extension_id: &str) -> bool {
    if window.tabs.len() == 1 && window.tabs[0].url.contains(extension_id) {
        return true;
    }
    matches!(window.window_type, WindowType::Popup | WindowType::Panel | WindowType::App)
}
