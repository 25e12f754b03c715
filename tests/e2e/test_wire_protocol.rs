//! End-to-end exercise of the §6 wire protocol through `MessageBus`,
//! driving a fake platform and a temp-file store exactly as a real UI
//! channel would.

use message_bus::MessageBus;
use platform_abstraction::{FakePlatform, PlatformApi, WindowType};
use reconciliation_engine::{ReconcilerConfig, ReconciliationEngine};
use session_store::SessionStore;
use shared_types::ids::WindowId;
use shared_types::tab::Tab;
use shared_types::{SpaceRequest, SpaceResponse};
use std::sync::Arc;

async fn setup() -> (MessageBus, Arc<FakePlatform>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions.db");
    let store = SessionStore::open(path.to_str().unwrap()).await.unwrap();
    let platform = Arc::new(FakePlatform::new());
    let config = ReconcilerConfig {
        extension_id: "my-extension".to_string(),
        ..ReconcilerConfig::default()
    };
    let engine = ReconciliationEngine::new(store, platform.clone() as Arc<dyn PlatformApi>, config);
    (MessageBus::new(engine, 1024 * 1024), platform, dir)
}

#[tokio::test]
async fn save_rename_and_delete_round_trip() {
    let (bus, platform, _dir) = setup().await;
    platform.open_window(WindowId(1), WindowType::Normal, vec![Tab::from_url("https://work.test")]);

    let saved = bus
        .dispatch(SpaceRequest::SaveNewSession {
            wid: Some(WindowId(1)),
            name: "work".to_string(),
            delete_old: false,
        })
        .await;
    let sid = match saved {
        SpaceResponse::Space(view) => {
            assert_eq!(view.name.as_deref(), Some("work"));
            view.session_id.expect("saved session has an id")
        }
        other => panic!("expected Space, got {other:?}"),
    };

    let presence = bus
        .dispatch(SpaceRequest::RequestSessionPresence { name: "work".to_string() })
        .await;
    assert!(matches!(presence, SpaceResponse::Presence { exists: true, is_open: true }));

    let renamed = bus
        .dispatch(SpaceRequest::UpdateSessionName {
            sid,
            name: "work-renamed".to_string(),
            delete_old: false,
        })
        .await;
    assert!(matches!(renamed, SpaceResponse::Space(ref v) if v.name.as_deref() == Some("work-renamed")));

    bus.dispatch(SpaceRequest::DeleteSession { sid }).await;

    let gone = bus
        .dispatch(SpaceRequest::RequestSessionPresence { name: "work-renamed".to_string() })
        .await;
    assert!(matches!(gone, SpaceResponse::Presence { exists: false, .. }));
}

#[tokio::test]
async fn renaming_over_an_existing_name_fails() {
    let (bus, platform, _dir) = setup().await;
    platform.open_window(WindowId(1), WindowType::Normal, vec![Tab::from_url("https://a.test")]);
    platform.open_window(WindowId(2), WindowType::Normal, vec![Tab::from_url("https://b.test")]);

    bus.dispatch(SpaceRequest::SaveNewSession { wid: Some(WindowId(1)), name: "alpha".to_string(), delete_old: false })
        .await;
    let beta = bus
        .dispatch(SpaceRequest::SaveNewSession { wid: Some(WindowId(2)), name: "beta".to_string(), delete_old: false })
        .await;
    let beta_sid = match beta {
        SpaceResponse::Space(v) => v.session_id.unwrap(),
        other => panic!("expected Space, got {other:?}"),
    };

    let collision = bus
        .dispatch(SpaceRequest::UpdateSessionName { sid: beta_sid, name: "alpha".to_string(), delete_old: false })
        .await;
    assert!(matches!(collision, SpaceResponse::Failure));
}

#[tokio::test]
async fn renaming_own_session_to_a_different_capitalization_with_delete_old_succeeds() {
    let (bus, platform, _dir) = setup().await;
    platform.open_window(WindowId(1), WindowType::Normal, vec![Tab::from_url("https://work.test")]);

    let saved = bus
        .dispatch(SpaceRequest::SaveNewSession { wid: Some(WindowId(1)), name: "work".to_string(), delete_old: false })
        .await;
    let sid = match saved {
        SpaceResponse::Space(view) => view.session_id.expect("saved session has an id"),
        other => panic!("expected Space, got {other:?}"),
    };

    let renamed = bus
        .dispatch(SpaceRequest::UpdateSessionName { sid, name: "Work".to_string(), delete_old: true })
        .await;
    assert!(matches!(renamed, SpaceResponse::Space(ref v) if v.name.as_deref() == Some("Work")));

    let presence = bus.dispatch(SpaceRequest::RequestSessionPresence { name: "Work".to_string() }).await;
    assert!(matches!(presence, SpaceResponse::Presence { exists: true, .. }));
}

#[tokio::test]
async fn all_spaces_lists_open_before_closed() {
    let (bus, platform, _dir) = setup().await;
    platform.open_window(WindowId(1), WindowType::Normal, vec![Tab::from_url("https://a.test")]);
    platform.open_window(WindowId(2), WindowType::Normal, vec![Tab::from_url("https://b.test")]);

    bus.dispatch(SpaceRequest::SaveNewSession { wid: Some(WindowId(1)), name: "open-one".to_string(), delete_old: false })
        .await;
    bus.dispatch(SpaceRequest::SaveNewSession { wid: Some(WindowId(2)), name: "open-two".to_string(), delete_old: false })
        .await;
    bus.dispatch(SpaceRequest::ImportNewSession { url_list: vec!["https://c.test".to_string()] }).await;

    let all = bus.dispatch(SpaceRequest::RequestAllSpaces).await;
    let SpaceResponse::AllSpaces(spaces) = all else { panic!("expected AllSpaces") };
    assert_eq!(spaces.len(), 3);
    assert!(spaces[0].window_id.is_some());
    assert!(spaces[1].window_id.is_some());
    assert!(spaces[2].window_id.is_none());
}

#[tokio::test]
async fn ui_control_request_is_a_safe_no_op() {
    let (bus, _platform, _dir) = setup().await;
    let response = bus.dispatch(SpaceRequest::RequestShowKeyboardShortcuts).await;
    assert!(matches!(response, SpaceResponse::Failure));
}
