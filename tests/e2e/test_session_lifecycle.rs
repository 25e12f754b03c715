//! End-to-end session lifecycle: a window opens unmatched, gets saved,
//! accumulates tab history, closes, and rebinds on "restart" by hash (§8).

use platform_abstraction::{FakePlatform, PlatformApi, WindowType};
use reconciliation_engine::{PlatformEvent, ReconcilerConfig, ReconciliationEngine};
use session_store::SessionStore;
use shared_types::ids::{TabId, WindowId};
use shared_types::tab::Tab;
use std::sync::Arc;

fn tab(id: i64, url: &str) -> Tab {
    Tab { id: Some(TabId(id)), ..Tab::from_url(url) }
}

#[tokio::test]
async fn full_lifecycle_save_close_reopen_rebind() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");

    let store = SessionStore::open(db_path.to_str().unwrap()).await.unwrap();
    let platform = Arc::new(FakePlatform::new());
    let config = ReconcilerConfig {
        extension_id: "ext-id".to_string(),
        debounce_millis: 30,
        ..ReconcilerConfig::default()
    };
    platform.open_window(WindowId(1), WindowType::Normal, vec![tab(1, "https://news.test")]);

    let engine = ReconciliationEngine::new(store, platform.clone() as Arc<dyn PlatformApi>, config);
    engine.ensure_initialized().await.unwrap();

    let temp = engine.registry().get_by_window(WindowId(1)).await.unwrap().unwrap();
    assert!(temp.is_temporary());

    let saved = engine
        .save_new_session("news".to_string(), vec![tab(1, "https://news.test")], Some(WindowId(1)), None)
        .await
        .unwrap();
    assert!(saved.id.is_some());

    // Navigate the tab; the debounced handler should refresh tabs and hash.
    platform.set_tabs(WindowId(1), vec![tab(1, "https://news.test/front-page")]);
    engine
        .handle_event(PlatformEvent::TabUpdated {
            tab: tab(1, "https://news.test/front-page"),
            window_id: WindowId(1),
            status_complete: true,
            changed_url: Some("https://news.test".to_string()),
        })
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let updated = engine.registry().get_by_id(saved.id.unwrap()).unwrap();
    assert_eq!(updated.tabs[0].url, "https://news.test/front-page");
    assert!(updated.history.iter().any(|t| t.url == "https://news.test"));

    // Close the window.
    platform.close_window(WindowId(1));
    engine.handle_event(PlatformEvent::WindowRemoved { window_id: WindowId(1) }).await.unwrap();
    assert!(engine.registry().get_by_window(WindowId(1)).await.unwrap().is_none());

    // Re-derive a fresh engine over the same database, simulating a
    // process restart where the platform hands back the same tab content
    // under a brand-new window id.
    let reopened = SessionStore::open(db_path.to_str().unwrap()).await.unwrap();
    let platform2 = Arc::new(FakePlatform::new());
    platform2.open_window(WindowId(99), WindowType::Normal, vec![tab(1, "https://news.test/front-page")]);
    let config2 = ReconcilerConfig { extension_id: "ext-id".to_string(), ..ReconcilerConfig::default() };
    let engine2 = ReconciliationEngine::new(reopened, platform2.clone() as Arc<dyn PlatformApi>, config2);
    engine2.ensure_initialized().await.unwrap();

    let rebound = engine2.registry().get_by_window(WindowId(99)).await.unwrap().unwrap();
    assert_eq!(rebound.id, saved.id);
    assert!(!rebound.is_temporary());
}

#[tokio::test]
async fn closed_window_id_never_rebinds() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(dir.path().join("sessions.db").to_str().unwrap()).await.unwrap();
    let platform = Arc::new(FakePlatform::new());
    let config = ReconcilerConfig { extension_id: "ext-id".to_string(), debounce_millis: 20, ..ReconcilerConfig::default() };

    platform.open_window(WindowId(5), WindowType::Normal, vec![tab(1, "https://a.test")]);
    let engine = ReconciliationEngine::new(store, platform.clone() as Arc<dyn PlatformApi>, config);
    engine.ensure_initialized().await.unwrap();

    platform.close_window(WindowId(5));
    engine.handle_event(PlatformEvent::WindowRemoved { window_id: WindowId(5) }).await.unwrap();

    // The platform (implausibly) reuses the same id for a new window; the
    // engine must never treat it as live again (invariant 7).
    platform.open_window(WindowId(5), WindowType::Normal, vec![tab(2, "https://b.test")]);
    engine.handle_event(PlatformEvent::TabMoved { window_id: WindowId(5) }).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;

    assert!(engine.registry().get_by_window(WindowId(5)).await.unwrap().is_none());
}
