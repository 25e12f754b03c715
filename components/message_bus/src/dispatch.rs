//! Translates wire requests (§6) into reconciliation-engine calls and
//! wire responses.

use reconciliation_engine::ReconciliationEngine;
use shared_types::session::Session;
use shared_types::{SpaceRequest, SpaceResponse, SpaceView};
use std::sync::Arc;
use tracing::{debug, warn};

fn session_to_view(s: &Session) -> SpaceView {
    SpaceView {
        session_id: s.id,
        window_id: s.window_id,
        name: s.name.clone(),
        tabs: s.tabs.clone(),
        history: Some(s.history.clone()),
    }
}

/// Dispatch one request to completion. Never panics and never propagates
/// an error past this boundary — §7 requires every engine failure to
/// degrade to `Failure` rather than reach the UI channel as an exception.
pub async fn dispatch(engine: &Arc<ReconciliationEngine>, req: SpaceRequest) -> SpaceResponse {
    if let Err(e) = engine.ensure_initialized().await {
        warn!(error = %e, "engine initialization failed, dropping request");
        return SpaceResponse::Failure;
    }

    match req {
        SpaceRequest::RequestSessionPresence { name } => {
            match engine_fetch_by_name(engine, &name).await {
                Some(session) => {
                    let is_open = session.window_id.is_some();
                    SpaceResponse::Presence { exists: true, is_open }
                }
                None => SpaceResponse::Presence { exists: false, is_open: false },
            }
        }

        SpaceRequest::RequestSpaceFromWindowId { wid } => match engine.registry().get_by_window(wid).await {
            Ok(Some(session)) => SpaceResponse::Space(session_to_view(&session)),
            _ => SpaceResponse::Failure,
        },

        SpaceRequest::RequestCurrentSpace => {
            // No notion of "the current window" exists at this layer (the
            // platform owns focus); callers are expected to resolve it to
            // a window id and use RequestSpaceFromWindowId instead.
            debug!("RequestCurrentSpace has no engine-level meaning; use RequestSpaceFromWindowId");
            SpaceResponse::Failure
        }

        SpaceRequest::RequestSpaceFromSessionId { sid } => match engine.registry().get_by_id(sid) {
            Some(session) => SpaceResponse::Space(session_to_view(&session)),
            None => SpaceResponse::Failure,
        },

        SpaceRequest::RequestAllSpaces => SpaceResponse::AllSpaces(all_spaces_sorted(engine).await),

        SpaceRequest::RequestTabDetail { tab_id } => {
            for session in engine.registry().get_all() {
                if let Some(tab) = session.tabs.iter().find(|t| t.id == Some(tab_id)) {
                    return SpaceResponse::TabDetail(tab.clone());
                }
            }
            SpaceResponse::Failure
        }

        SpaceRequest::SaveNewSession { wid, name, delete_old } => {
            let Some(wid) = wid else { return SpaceResponse::Failure };
            if delete_old {
                if let Err(e) = engine.delete_session_by_name(&name, None).await {
                    warn!(error = %e, "delete_old failed before save_new_session");
                }
            }
            let tabs = engine.live_tabs(wid).await;
            respond_with_session(engine.save_new_session(name, tabs, Some(wid), None).await)
        }

        SpaceRequest::UpdateSessionName { sid, name, delete_old } => {
            if delete_old {
                if let Err(e) = engine.delete_session_by_name(&name, Some(sid)).await {
                    warn!(error = %e, "delete_old failed before update_session_name");
                }
            }
            respond_with_session(engine.update_session_name(sid, name).await)
        }

        SpaceRequest::DeleteSession { sid } => match engine.delete_session(sid).await {
            Ok(()) => SpaceResponse::Space(SpaceView {
                session_id: None,
                window_id: None,
                name: None,
                tabs: vec![],
                history: None,
            }),
            Err(e) => {
                warn!(error = %e, "delete_session failed");
                SpaceResponse::Failure
            }
        },

        SpaceRequest::LoadSession { .. } | SpaceRequest::LoadWindow { .. } | SpaceRequest::SwitchToSpace { .. } => {
            // Opening/focusing a window is a platform action, explicitly
            // out of scope (§1); the UI layer performs it directly.
            debug!("load/switch requests are resolved by the platform layer, not the engine");
            SpaceResponse::Failure
        }

        SpaceRequest::MoveTabToSession { tab_id, sid } => respond_with_session(engine.move_tab_to_session(tab_id, sid).await),

        SpaceRequest::AddLinkToSession { url, sid } => respond_with_session(engine.add_link_to_session(url, sid).await),

        SpaceRequest::MoveTabToWindow { tab_id, wid } => respond_with_session(engine.move_tab_to_window(tab_id, wid).await),

        SpaceRequest::AddLinkToWindow { url, wid } => respond_with_session(engine.add_link_to_window(url, wid).await),

        SpaceRequest::MoveTabToNewSession { tab_id, name } => {
            respond_with_session(engine.move_tab_to_new_session(tab_id, name).await)
        }

        SpaceRequest::AddLinkToNewSession { url, name } => {
            respond_with_session(engine.add_link_to_new_session(url, name).await)
        }

        SpaceRequest::ImportNewSession { url_list } => {
            let tabs = url_list.into_iter().map(shared_types::tab::Tab::from_url).collect();
            respond_with_session(engine.import_new_session(None, tabs).await)
        }

        SpaceRequest::RestoreFromBackup { space, delete_old } => respond_with_session(
            engine
                .restore_space_from_view(space.name, space.tabs, space.history.unwrap_or_default(), delete_old)
                .await,
        ),

        SpaceRequest::RequestShowSpaces
        | SpaceRequest::RequestShowSwitcher
        | SpaceRequest::RequestShowMover
        | SpaceRequest::RequestShowKeyboardShortcuts
        | SpaceRequest::RequestClose
        | SpaceRequest::GeneratePopupParams { .. } => {
            // Pure UI-chrome control, no engine state change (§6).
            SpaceResponse::Failure
        }
    }
}

async fn engine_fetch_by_name(engine: &Arc<ReconciliationEngine>, name: &str) -> Option<Session> {
    engine
        .registry()
        .get_all()
        .into_iter()
        .find(|s| s.name.as_deref().map(|n| n.eq_ignore_ascii_case(name)).unwrap_or(false))
}

fn respond_with_session(result: Result<Session, reconciliation_engine::ReconcileError>) -> SpaceResponse {
    match result {
        Ok(session) => SpaceResponse::Space(session_to_view(&session)),
        Err(e) => {
            warn!(error = %e, "mutation failed");
            SpaceResponse::Failure
        }
    }
}

/// §6: open spaces first, then closed, each group sorted by descending
/// `last_access` — delegates the actual merge to the engine, which is the
/// only thing that can see both the registry and the store.
async fn all_spaces_sorted(engine: &Arc<ReconciliationEngine>) -> Vec<SpaceView> {
    match engine.list_all_spaces().await {
        Ok(sessions) => sessions.iter().map(session_to_view).collect(),
        Err(e) => {
            warn!(error = %e, "list_all_spaces failed");
            Vec::new()
        }
    }
}
