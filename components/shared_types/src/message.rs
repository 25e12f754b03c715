//! The wire message protocol spoken between the engine and the UI (§6).
//!
//! Every request is a tagged record carrying an `action` discriminant;
//! `serde`'s internally-tagged enum representation gives that shape for
//! free. Parameters that arrive over the wire as the strings `"false"` /
//! `"true"` or as numeric strings are the UI channel's problem to
//! canonicalize before constructing a `SpaceRequest` — once in Rust, values
//! are properly typed `Option`s, never string sentinels.

use crate::ids::{SessionId, TabId, WindowId};
use crate::tab::Tab;
use serde::{Deserialize, Serialize};

/// Requests the UI can send to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SpaceRequest {
    // --- Queries ---
    RequestSessionPresence { name: String },
    RequestSpaceFromWindowId { wid: WindowId },
    RequestCurrentSpace,
    RequestSpaceFromSessionId { sid: SessionId },
    RequestAllSpaces,
    RequestTabDetail { tab_id: TabId },

    // --- Mutations ---
    SaveNewSession {
        wid: Option<WindowId>,
        name: String,
        delete_old: bool,
    },
    UpdateSessionName {
        sid: SessionId,
        name: String,
        delete_old: bool,
    },
    DeleteSession {
        sid: SessionId,
    },
    LoadSession {
        sid: SessionId,
        tab_url: Option<String>,
    },
    LoadWindow {
        wid: WindowId,
        tab_url: Option<String>,
    },
    SwitchToSpace {
        sid: Option<SessionId>,
        wid: Option<WindowId>,
    },
    MoveTabToSession {
        tab_id: TabId,
        sid: SessionId,
    },
    AddLinkToSession {
        url: String,
        sid: SessionId,
    },
    MoveTabToWindow {
        tab_id: TabId,
        wid: WindowId,
    },
    AddLinkToWindow {
        url: String,
        wid: WindowId,
    },
    MoveTabToNewSession {
        tab_id: TabId,
        name: String,
    },
    AddLinkToNewSession {
        url: String,
        name: String,
    },
    ImportNewSession {
        url_list: Vec<String>,
    },
    RestoreFromBackup {
        space: SpaceView,
        delete_old: bool,
    },

    // --- UI control, no engine state change ---
    RequestShowSpaces,
    RequestShowSwitcher,
    RequestShowMover,
    RequestShowKeyboardShortcuts,
    RequestClose,
    GeneratePopupParams {
        popup_action: String,
        tab_url: Option<String>,
    },
}

/// Responses the engine sends back to the UI.
///
/// Every mutation responds with either the updated [`SpaceView`] or
/// `Failure` (wire-encoded as `false`, §6). Queries get their own typed
/// shapes; `Dropped` is never actually sent — a malformed request is
/// dropped with no response (§7) — it exists so internal dispatch code has
/// a value to return without inventing a fake success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum SpaceResponse {
    Space(SpaceView),
    Presence { exists: bool, is_open: bool },
    AllSpaces(Vec<SpaceView>),
    TabDetail(Tab),
    Failure,
}

/// Wire shape for a space, returned to the UI (§6).
///
/// `sessionId`/`windowId`/`name`/`history` are `false` on the wire when
/// absent; that encoding happens only at the serialization boundary
/// (`to_wire_value`), never in the `Option` fields themselves, per the
/// "polymorphic false sentinels" re-architecture note in §9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceView {
    pub session_id: Option<SessionId>,
    pub window_id: Option<WindowId>,
    pub name: Option<String>,
    pub tabs: Vec<Tab>,
    pub history: Option<Vec<Tab>>,
}

impl SpaceView {
    /// Render to the `{field: false}`-sentinel shape the wire protocol
    /// actually uses (§9): absent options become the JSON literal `false`
    /// rather than `null`, matching the source's polymorphic sentinel.
    pub fn to_wire_value(&self) -> serde_json::Value {
        serde_json::json!({
            "sessionId": self.session_id.map(|id| serde_json::json!(id.0)).unwrap_or(serde_json::json!(false)),
            "windowId": self.window_id.map(|id| serde_json::json!(id.0)).unwrap_or(serde_json::json!(false)),
            "name": self.name.clone().map(serde_json::Value::String).unwrap_or(serde_json::json!(false)),
            "tabs": self.tabs,
            "history": self.history.clone().map(|h| serde_json::json!(h)).unwrap_or(serde_json::json!(false)),
        })
    }
}
