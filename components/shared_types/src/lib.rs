//! Shared Types Library
//!
//! Common domain types, identifier newtypes, the wire message protocol, and
//! cross-cutting error types used by every crate in the space reconciliation
//! engine.
//!
//! # Modules
//!
//! - `ids`: `WindowId`, `TabId` (ephemeral) and `SessionId` (durable)
//! - `tab`: `Tab` and `WindowBounds`
//! - `session`: the `Session` domain record
//! - `message`: the `SpaceRequest` / `SpaceResponse` wire protocol
//! - `error`: cross-cutting error types (`StoreError`)
//!
//! # Example
//!
//! ```rust
//! use shared_types::ids::{SessionId, WindowId};
//! use shared_types::session::Session;
//!
//! let session = Session::new_temporary(WindowId(1), 0, vec![], 0);
//! assert!(session.is_temporary());
//! ```

pub mod error;
pub mod ids;
pub mod message;
pub mod session;
pub mod tab;

pub use error::StoreError;
pub use ids::{SessionId, TabId, WindowId};
pub use message::{SpaceRequest, SpaceResponse, SpaceView};
pub use session::{Session, MAX_HISTORY_ENTRIES};
pub use tab::{Tab, WindowBounds};
