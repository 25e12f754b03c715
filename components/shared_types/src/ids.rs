//! Identifier newtypes for the space reconciliation engine.
//!
//! `WindowId` and `TabId` are ephemeral, assigned by the platform and
//! meaningless across a process restart. `SessionId` is durable, assigned
//! by the session store, and survives restarts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ephemeral platform window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub i64);

impl WindowId {
    /// Platform window ids are always positive; `<= 0` denotes "no window"
    /// in several platform callback shapes (see the reconciliation engine's
    /// event handlers).
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ephemeral platform tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable session identifier, allocated by the session store.
///
/// A session without an assigned `SessionId` is a *temporary* session
/// (registry invariant 2 in `spec.md`): in-memory only, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_id_validity() {
        assert!(WindowId(1).is_valid());
        assert!(!WindowId(0).is_valid());
        assert!(!WindowId(-1).is_valid());
    }

    #[test]
    fn ids_are_ordered_by_value() {
        assert!(SessionId(1) < SessionId(2));
        assert!(TabId(5) > TabId(4));
    }
}
