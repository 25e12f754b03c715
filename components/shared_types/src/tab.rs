//! Tab and window-bounds types shared across the reconciliation engine.

use crate::ids::TabId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single browser tab, as tracked in a session's `tabs` or `history`.
///
/// `extra` preserves platform fields the engine doesn't interpret (scroll
/// position, mute state, discard state, ...) verbatim for round-trip, per
/// the data model's "other platform fields are preserved verbatim" note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    /// Platform tab id, when the tab is backed by a live window.
    #[serde(default)]
    pub id: Option<TabId>,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    /// Arbitrary platform fields not otherwise modeled, preserved verbatim.
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Tab {
    /// Construct a minimal tab from just a URL, the common case for
    /// synthesized entries (imports, history reconstruction).
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            title: String::new(),
            pinned: false,
            fav_icon_url: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Persisted window geometry, restored when a session's window reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_fields_round_trip() {
        let json = serde_json::json!({
            "url": "https://example.com",
            "title": "Example",
            "pinned": false,
            "favIconUrl": null,
            "discarded": true,
            "mutedInfo": { "muted": false }
        });
        let tab: Tab = serde_json::from_value(json).unwrap();
        assert_eq!(tab.url, "https://example.com");
        assert_eq!(tab.extra.get("discarded"), Some(&serde_json::json!(true)));
        assert!(tab.extra.contains_key("mutedInfo"));

        let back = serde_json::to_value(&tab).unwrap();
        assert_eq!(back["discarded"], serde_json::json!(true));
    }

    #[test]
    fn from_url_is_minimal() {
        let tab = Tab::from_url("https://x.test");
        assert_eq!(tab.url, "https://x.test");
        assert!(tab.id.is_none());
        assert!(!tab.pinned);
    }
}
