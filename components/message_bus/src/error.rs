//! Error types for the wire dispatch layer.
//!
//! Engine failures never reach this type: `dispatch` degrades every
//! `ReconcileError` to `SpaceResponse::Failure` at the call site (§7), so
//! the only failure this crate's own boundary produces is a validation
//! rejection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageBusError {
    #[error("request validation failed: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, MessageBusError>;
