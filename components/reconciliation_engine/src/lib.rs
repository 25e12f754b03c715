//! Reconciliation Engine (C5) — the event-driven state machine that binds
//! live browser windows to saved sessions.
//!
//! This is the component the rest of the workspace exists to serve:
//! `session_store` persists, `session_registry` mirrors in memory,
//! `platform_abstraction` supplies the live world, and this crate is the
//! logic that reconciles the two under concurrent, debounced events.

mod api;
mod events;
mod matching;
mod types;

pub use types::{
    EngineMetrics, HistoryAction, HistoryQueueEntry, MetricsSnapshot, PlatformEvent,
    ReconcileError, ReconcilerConfig,
};

use platform_abstraction::PlatformApi;
use session_registry::Registry;
use session_store::SessionStore;
use shared_types::ids::WindowId;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Tri-state single-flight barrier for cold-start initialization (§5,
/// §4.5.2). `InProgress` carries a `Notify` so concurrent callers can wait
/// for the in-flight run instead of racing it.
enum InitState {
    Never,
    InProgress(Arc<Notify>),
    Done,
}

pub struct ReconciliationEngine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) store: SessionStore,
    pub(crate) platform: Arc<dyn PlatformApi>,
    pub(crate) config: ReconcilerConfig,
    pub(crate) metrics: EngineMetrics,

    /// Maps a currently-open tab to its last known URL, used to emit a
    /// history "remove" action when that URL later disappears (§4.5.4).
    pub(crate) tab_history_url_map: parking_lot::Mutex<HashMap<shared_types::ids::TabId, String>>,
    /// Window ids the engine has seen close; once in this set, a window id
    /// never rebinds for the life of the process (invariant 7).
    pub(crate) closed_window_ids: parking_lot::Mutex<HashSet<WindowId>>,
    /// Pending history mutations, applied the next time the owning
    /// window's debounce timer fires (§4.5.5).
    pub(crate) history_queue: parking_lot::Mutex<VecDeque<HistoryQueueEntry>>,
    pub(crate) session_update_timers: parking_lot::Mutex<HashMap<WindowId, JoinHandle<()>>>,
    pub(crate) bounds_update_timers: parking_lot::Mutex<HashMap<WindowId, JoinHandle<()>>>,
    pub(crate) event_queue_count: AtomicU64,

    init_state: tokio::sync::Mutex<InitState>,
    is_restart_pending: AtomicBool,
}

impl ReconciliationEngine {
    pub fn new(
        store: SessionStore,
        platform: Arc<dyn PlatformApi>,
        config: ReconcilerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(Registry::new(store.clone())),
            store,
            platform,
            config,
            metrics: EngineMetrics::default(),
            tab_history_url_map: parking_lot::Mutex::new(HashMap::new()),
            closed_window_ids: parking_lot::Mutex::new(HashSet::new()),
            history_queue: parking_lot::Mutex::new(VecDeque::new()),
            session_update_timers: parking_lot::Mutex::new(HashMap::new()),
            bounds_update_timers: parking_lot::Mutex::new(HashMap::new()),
            event_queue_count: AtomicU64::new(0),
            init_state: tokio::sync::Mutex::new(InitState::Never),
            is_restart_pending: AtomicBool::new(false),
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Single-flight cold-start barrier (§5): the first caller runs
    /// `run_init_sequence`, every concurrent caller waits on its `Notify`
    /// rather than duplicating the work.
    pub async fn ensure_initialized(self: &Arc<Self>) -> Result<(), ReconcileError> {
        loop {
            let mut guard = self.init_state.lock().await;
            match &*guard {
                InitState::Done => return Ok(()),
                InitState::InProgress(notify) => {
                    let notify = Arc::clone(notify);
                    drop(guard);
                    notify.notified().await;
                    continue;
                }
                InitState::Never => {
                    let notify = Arc::new(Notify::new());
                    *guard = InitState::InProgress(Arc::clone(&notify));
                    drop(guard);

                    let result = self.run_init_sequence().await;

                    let mut guard = self.init_state.lock().await;
                    *guard = match &result {
                        Ok(()) => InitState::Done,
                        Err(_) => InitState::Never,
                    };
                    drop(guard);
                    notify.notify_waiters();
                    return result;
                }
            }
        }
    }

    /// Forces a re-run of the init sequence on the next `ensure_initialized`
    /// call, and runs the restart-specific steps within it (§4.5.2 step 1).
    pub async fn reinitialize_after_restart(self: &Arc<Self>) -> Result<(), ReconcileError> {
        self.is_restart_pending.store(true, Ordering::SeqCst);
        *self.init_state.lock().await = InitState::Never;
        self.ensure_initialized().await
    }

    /// The 6-step cold-start sequence (§4.5.2).
    async fn run_init_sequence(self: &Arc<Self>) -> Result<(), ReconcileError> {
        let is_restart = self.is_restart_pending.swap(false, Ordering::SeqCst);

        // Step 1: one-shot version-change migration. window_id has no
        // column under this schema, so the restart-specific "clear stale
        // window ids" step has nothing to do; the hash reset still runs
        // when the build version changed since the last run.
        let last_version = self.store.get_extension_version().await?;
        if last_version.as_deref() != Some(self.config.extension_version.as_str()) {
            info!(
                from = last_version.as_deref().unwrap_or("<none>"),
                to = %self.config.extension_version,
                "extension version changed, resetting all session hashes"
            );
            self.reset_all_session_hashes().await?;
            self.store.set_extension_version(&self.config.extension_version).await?;
        }
        if is_restart {
            info!("process restart detected; window_id is never persisted, nothing to clear");
        }

        // Step 2: bulk-load the store into the registry.
        let all = self.store.fetch_all().await?;
        self.registry.bulk_load(all);

        // Step 3-4: enumerate live windows, filter internal ones, match.
        let live = self.platform.list_live_windows().await;
        for window in &live {
            if events::filter_internal_windows(window, &self.config.extension_id) {
                continue;
            }
            self.init_time_match(window).await;
        }

        // Step 5-6: populate tab_history_url_map from whatever ended up
        // bound, so later tab-updates can diff against a known baseline.
        let mut map = self.tab_history_url_map.lock();
        for window in &live {
            for tab in &window.tabs {
                if let Some(id) = tab.id {
                    map.insert(id, tab.url.clone());
                }
            }
        }
        drop(map);

        Ok(())
    }

    /// One-shot migration hook: recompute every persisted session's hash
    /// using the current normalization rules. Triggered by an extension
    /// version change (§4.5.2 step 1).
    async fn reset_all_session_hashes(&self) -> Result<(), ReconcileError> {
        let all = self.store.fetch_all().await?;
        for mut session in all {
            session.session_hash = session_hash::session_hash(
                session.tabs.iter().map(|t| t.url.as_str()),
                &self.config.extension_id,
            );
            if let Err(e) = self.store.update(session).await {
                warn!(error = %e, "failed to persist hash reset for a session");
            }
        }
        Ok(())
    }
}
