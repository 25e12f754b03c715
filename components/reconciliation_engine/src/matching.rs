//! The matching algorithm (§4.5.3): binding live windows to sessions.

use crate::types::now;
use crate::ReconciliationEngine;
use platform_abstraction::PlatformWindow;
use session_hash::session_hash;
use shared_types::ids::WindowId;
use shared_types::session::Session;
use std::sync::Arc;
use tracing::{debug, warn};

impl ReconciliationEngine {
    /// Init-time match (§4.5.3): on service reactivation the window is
    /// already bound, so this is a no-op; otherwise run ensure-session.
    pub(crate) async fn init_time_match(self: &Arc<Self>, window: &PlatformWindow) {
        if let Ok(Some(_)) = self.registry.get_by_window(window.id).await {
            return;
        }
        if let Err(e) = self.ensure_session(window.id, &window.tabs).await {
            warn!(window_id = window.id.0, error = %e, "ensure-session failed during init");
        }
    }

    /// Ensure a window has a bound session, creating a temporary one if no
    /// durable match exists (§4.5.3 "ensure-session").
    pub(crate) async fn ensure_session(
        self: &Arc<Self>,
        wid: WindowId,
        tabs: &[shared_types::tab::Tab],
    ) -> Result<(), crate::ReconcileError> {
        let urls: Vec<&str> = tabs.iter().map(|t| t.url.as_str()).collect();
        let h = session_hash(urls, &self.config.extension_id);

        // Double-check guards against races between the initial scan and
        // this point, and is what makes it safe to call ensure-session
        // again on an already-temporary session (it just returns here).
        if self.registry.get_by_window(wid).await?.is_some() {
            return Ok(());
        }

        let candidate = self
            .store
            .fetch_all()
            .await?
            .into_iter()
            .find(|s| s.session_hash == h && !self.is_bound_anywhere(s));

        if let Some(found) = candidate {
            self.bind(found, wid).await?;
            return Ok(());
        }

        let temp = Session::new_temporary(wid, h, tabs.to_vec(), now());
        if !self.registry.add_safely(temp) {
            self.metrics.record_invariant_rejection();
            debug!(window_id = wid.0, "race: another task already bound this window");
        }
        Ok(())
    }

    fn is_bound_anywhere(&self, candidate: &Session) -> bool {
        candidate
            .id
            .and_then(|id| self.registry.get_by_id(id))
            .and_then(|s| s.window_id)
            .is_some()
    }

    /// `bind(S, W)`: unbind anything currently at `W`, then bind the
    /// durable session `s` to it (§4.5.3).
    pub(crate) async fn bind(self: &Arc<Self>, s: Session, wid: WindowId) -> Result<(), crate::ReconcileError> {
        self.unbind_window(wid).await?;

        let id = s.id.expect("bind is only called with durable sessions");
        if self.registry.get_by_id(id).is_none() {
            let mut with_window = s;
            with_window.window_id = Some(wid);
            self.registry.add_safely(with_window);
        } else {
            self.registry.set_window_id(id, Some(wid));
        }
        self.metrics.record_bind();
        Ok(())
    }

    /// Clear any existing registry entry bound to `wid`: a durable entry
    /// has its `window_id` cleared (and persisted), a temporary one is
    /// spliced out entirely.
    pub(crate) async fn unbind_window(&self, wid: WindowId) -> Result<(), crate::ReconcileError> {
        if let Some(existing) = self.registry.get_by_window(wid).await? {
            if let Some(id) = existing.id {
                self.registry.set_window_id(id, None);
                self.metrics.record_rebind();
            } else {
                self.registry.remove_by_window(wid);
            }
        }
        Ok(())
    }
}
