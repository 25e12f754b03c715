//! The platform boundary: everything the reconciliation engine needs to
//! *ask* the browser platform about live windows and tabs.
//!
//! The real platform (window enumeration, tab contents, focus/bounds
//! events) is explicitly out of scope (§1 "Out of scope"); this crate is
//! only the seam the engine calls through, plus an in-memory fake used by
//! tests and `space_shelld`'s demo mode.

use async_trait::async_trait;
use shared_types::ids::WindowId;
use shared_types::tab::Tab;
use std::collections::HashMap;

/// Platform window kind, used by `filter_internal_windows` (§4.5.5 step 3)
/// to skip browser-chrome windows that aren't user spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Normal,
    Popup,
    Panel,
    App,
}

/// A live window as reported by the platform: its id, kind, and current
/// tab list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformWindow {
    pub id: WindowId,
    pub window_type: WindowType,
    pub tabs: Vec<Tab>,
}

/// Everything the engine needs to pull from the platform. All methods are
/// read-only queries; the platform pushes events to the engine by other
/// means (out of scope here — see §1), so this trait has no event stream.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// All windows currently open, populated with their tabs.
    async fn list_live_windows(&self) -> Vec<PlatformWindow>;

    /// A single window by id, or `None` if it no longer exists — the
    /// `StalePlatformHandle` case in §7.
    async fn get_window(&self, wid: WindowId) -> Option<PlatformWindow>;
}

/// An in-memory fake platform for tests and the demo CLI. Windows are
/// keyed by id; callers mutate them directly to simulate platform events.
#[derive(Default)]
pub struct FakePlatform {
    windows: parking_lot::Mutex<HashMap<WindowId, PlatformWindow>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_window(&self, id: WindowId, window_type: WindowType, tabs: Vec<Tab>) {
        self.windows.lock().insert(id, PlatformWindow { id, window_type, tabs });
    }

    pub fn close_window(&self, id: WindowId) {
        self.windows.lock().remove(&id);
    }

    pub fn set_tabs(&self, id: WindowId, tabs: Vec<Tab>) {
        if let Some(window) = self.windows.lock().get_mut(&id) {
            window.tabs = tabs;
        }
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn list_live_windows(&self) -> Vec<PlatformWindow> {
        self.windows.lock().values().cloned().collect()
    }

    async fn get_window(&self, wid: WindowId) -> Option<PlatformWindow> {
        self.windows.lock().get(&wid).cloned()
    }
}
