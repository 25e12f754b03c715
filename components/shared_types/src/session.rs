//! The `Session` domain record — the durable-or-temporary unit the whole
//! engine reconciles against windows. See §3 of the data model.

use crate::ids::{SessionId, WindowId};
use crate::tab::{Tab, WindowBounds};
use serde::{Deserialize, Serialize};

/// One saved (or in-flight temporary) space.
///
/// `id` is `None` for a *temporary* session: registry-only, never persisted,
/// and required (invariant 2) to carry a present `window_id`. `window_id` is
/// itself never persisted (§6) — it is runtime state the registry tracks and
/// the store has no column for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<SessionId>,
    pub name: Option<String>,
    pub session_hash: u32,
    pub tabs: Vec<Tab>,
    pub history: Vec<Tab>,
    pub last_access: i64,
    pub window_bounds: Option<WindowBounds>,
    #[serde(skip)]
    pub window_id: Option<WindowId>,
}

/// Upper bound on `history.len()`, per §3 invariant 5.
pub const MAX_HISTORY_ENTRIES: usize = 200;

impl Session {
    /// Build a fresh temporary session for a just-observed, unmatched live
    /// window (§4.5.3 "ensure-session" step 5).
    pub fn new_temporary(window_id: WindowId, session_hash: u32, tabs: Vec<Tab>, now: i64) -> Self {
        Self {
            id: None,
            name: None,
            session_hash,
            tabs,
            history: Vec::new(),
            last_access: now,
            window_bounds: None,
            window_id: Some(window_id),
        }
    }

    /// A session is temporary iff it has no durable id (§3 Lifecycle).
    pub fn is_temporary(&self) -> bool {
        self.id.is_none()
    }

    /// Truncate `history` to `MAX_HISTORY_ENTRIES`, dropping the oldest
    /// (history is kept newest-first, so this trims the tail).
    pub fn truncate_history(&mut self) {
        self.history.truncate(MAX_HISTORY_ENTRIES);
    }
}
