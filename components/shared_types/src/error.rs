//! Error types shared across the reconciliation engine's crates.
//!
//! Each crate that owns I/O or mutable state defines its own error enum at
//! its boundary: `StoreError` here for the store's own I/O failures, and
//! `RegistryError`/`ReconcileError`/`MessageBusError` in their respective
//! crates for everything further up the call chain, including the
//! unique-name-conflict case (`ReconcileError::NameConflict`, per §3
//! invariant 4) — that one isn't cross-cutting enough to live here since
//! only the reconciliation engine ever constructs it.

use thiserror::Error;

/// Failures from the session store's underlying key/value backend.
///
/// Per §7, a `StoreError` is logged and degraded at the call site (the
/// caller returns `None`/`false`) rather than propagated to the UI channel.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("session {0} not found")]
    NotFound(i64),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::NotFound(42);
        assert!(err.to_string().contains("42"));
    }
}
