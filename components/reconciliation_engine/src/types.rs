//! Engine-local types: configuration, errors, metrics, and the public
//! event/mutation vocabulary.

use shared_types::ids::{TabId, WindowId};
use shared_types::tab::{Tab, WindowBounds};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Tunables that §3/§4 treat as fixed constants. Externalized as config
/// per SPEC_FULL §D / §F.1 rather than hard-coded, in the teacher's
/// `clap`-derived-config idiom.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub db_path: String,
    /// The running extension's own identifier, used by `clean_url` to
    /// filter self-pages (§4.1 rule 2).
    pub extension_id: String,
    /// Current build version, compared against the last-seen version
    /// stored by the previous run to trigger `reset_all_session_hashes`.
    pub extension_version: String,
    pub history_cap: usize,
    pub debounce_millis: u64,
    /// Advisory cap on `closed_window_ids`' size: logged when exceeded,
    /// never enforced by eviction (evicting an entry would violate
    /// invariant 7 — a closed window id must never rebind for the rest of
    /// the process's life).
    pub max_closed_window_ids: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            db_path: "sessions.db".to_string(),
            extension_id: String::new(),
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
            history_cap: shared_types::MAX_HISTORY_ENTRIES,
            debounce_millis: 1000,
            max_closed_window_ids: 10_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] shared_types::StoreError),
    #[error("registry error: {0}")]
    Registry(#[from] session_registry::RegistryError),
    #[error("a session named {0:?} already exists")]
    NameConflict(String),
    #[error("window {0} is already bound to a durable session")]
    InvariantViolation(i64),
}

/// Counters for the ambient observability surface (SPEC_FULL §F.4).
#[derive(Default)]
pub struct EngineMetrics {
    binds: AtomicU64,
    rebinds: AtomicU64,
    invariant_rejections: AtomicU64,
    debounce_coalescions: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub binds: u64,
    pub rebinds: u64,
    pub invariant_rejections: u64,
    pub debounce_coalescions: u64,
}

impl EngineMetrics {
    pub(crate) fn record_bind(&self) {
        self.binds.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_rebind(&self) {
        self.rebinds.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_invariant_rejection(&self) {
        self.invariant_rejections.fetch_add(1, Ordering::Relaxed);
    }
    pub(crate) fn record_debounce_coalescion(&self) {
        self.debounce_coalescions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            binds: self.binds.load(Ordering::Relaxed),
            rebinds: self.rebinds.load(Ordering::Relaxed),
            invariant_rejections: self.invariant_rejections.load(Ordering::Relaxed),
            debounce_coalescions: self.debounce_coalescions.load(Ordering::Relaxed),
        }
    }
}

/// Platform events the engine reacts to (§4.5.4). The real platform push
/// channel is out of scope; this is the vocabulary callers (tests,
/// `space_shelld`'s demo loop) use to drive the engine.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    TabCreated { window_id: WindowId },
    TabUpdated {
        tab: Tab,
        window_id: WindowId,
        status_complete: bool,
        changed_url: Option<String>,
    },
    TabRemoved {
        tab_id: TabId,
        window_id: WindowId,
        is_window_closing: bool,
    },
    TabMoved { window_id: WindowId },
    WindowFocusChanged { window_id: WindowId },
    WindowRemoved { window_id: WindowId },
    WindowBoundsChanged { window_id: WindowId, bounds: WindowBounds },
}

impl PlatformEvent {
    pub fn window_id(&self) -> WindowId {
        match self {
            PlatformEvent::TabCreated { window_id }
            | PlatformEvent::TabUpdated { window_id, .. }
            | PlatformEvent::TabRemoved { window_id, .. }
            | PlatformEvent::TabMoved { window_id }
            | PlatformEvent::WindowFocusChanged { window_id }
            | PlatformEvent::WindowRemoved { window_id }
            | PlatformEvent::WindowBoundsChanged { window_id, .. } => *window_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct HistoryQueueEntry {
    pub url: String,
    pub window_id: WindowId,
    pub action: HistoryAction,
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
