//! Message Bus — the wire dispatch layer between the UI channel and the
//! reconciliation engine (§6).
//!
//! The teacher's original bus routed arbitrary `ComponentMessage`s between
//! many registered components through a priority queue. This service has
//! exactly one logical recipient (the engine) and one request shape
//! (`SpaceRequest`/`SpaceResponse`), so the router/queue/registry/threading
//! machinery that existed purely to fan messages out to many components
//! has no counterpart here; what's kept is the teacher's
//! validate-then-dispatch shape and its `thiserror` error type.

mod dispatch;
mod error;
mod validator;

pub use error::MessageBusError;

use reconciliation_engine::ReconciliationEngine;
use shared_types::{SpaceRequest, SpaceResponse};
use std::sync::Arc;
use tracing::warn;
use validator::RequestValidator;

/// Validates and dispatches wire requests to a reconciliation engine.
pub struct MessageBus {
    engine: Arc<ReconciliationEngine>,
    validator: RequestValidator,
}

impl MessageBus {
    pub fn new(engine: Arc<ReconciliationEngine>, max_request_size: usize) -> Self {
        Self { engine, validator: RequestValidator::new(max_request_size) }
    }

    /// Validate and dispatch a single request. A validation failure is a
    /// "Malformed request" (§7): logged and degraded to `Failure` rather
    /// than propagated.
    pub async fn dispatch(&self, request: SpaceRequest) -> SpaceResponse {
        if let Err(e) = self.validator.validate(&request) {
            warn!(error = %e, "rejecting malformed request");
            return SpaceResponse::Failure;
        }
        dispatch::dispatch(&self.engine, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_abstraction::{FakePlatform, PlatformApi};
    use reconciliation_engine::ReconcilerConfig;
    use session_store::SessionStore;

    async fn bus() -> (MessageBus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let store = SessionStore::open(path.to_str().unwrap()).await.unwrap();
        let platform = Arc::new(FakePlatform::new());
        let engine = ReconciliationEngine::new(store, platform as Arc<dyn PlatformApi>, ReconcilerConfig::default());
        (MessageBus::new(engine, 64 * 1024), dir)
    }

    #[tokio::test]
    async fn request_all_spaces_on_empty_store_is_empty() {
        let (bus, _dir) = bus().await;
        let response = bus.dispatch(SpaceRequest::RequestAllSpaces).await;
        assert!(matches!(response, SpaceResponse::AllSpaces(v) if v.is_empty()));
    }

    #[tokio::test]
    async fn ui_control_requests_degrade_to_failure() {
        let (bus, _dir) = bus().await;
        let response = bus.dispatch(SpaceRequest::RequestShowSpaces).await;
        assert!(matches!(response, SpaceResponse::Failure));
    }
}
