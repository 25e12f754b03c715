//! Request validation (§7 "Malformed request").

use crate::error::{MessageBusError, Result};
use shared_types::SpaceRequest;

/// Validates an incoming request before it reaches the engine. Keeps the
/// same size-limit shape the teacher's bus applied to `ComponentMessage`,
/// scoped down to the single request type this wire protocol actually
/// carries.
pub struct RequestValidator {
    max_request_size: usize,
}

impl RequestValidator {
    pub fn new(max_request_size: usize) -> Self {
        Self { max_request_size }
    }

    pub fn validate(&self, req: &SpaceRequest) -> Result<()> {
        let size = serde_json::to_vec(req)
            .map_err(|e| MessageBusError::ValidationError(e.to_string()))?
            .len();
        if size > self.max_request_size {
            return Err(MessageBusError::ValidationError(format!(
                "request size {size} exceeds limit {}",
                self.max_request_size
            )));
        }
        Ok(())
    }
}
