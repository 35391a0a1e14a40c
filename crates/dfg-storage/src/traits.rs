//! The [`SessionStore`] trait defining the storage contract for dialog
//! sessions.
//!
//! A session is a named slot holding the latest [`SessionSnapshot`] of a
//! dialog. The high-level helpers [`SessionStore::save_context`] and
//! [`SessionStore::load_context`] convert to and from a live
//! [`DialogContext`]. All backends implement this trait and are swappable.

use std::sync::Arc;

use dfg_core::{DialogContext, TypeRegistry};

use crate::convert::{dump_context, restore_context, SessionSnapshot};
use crate::error::StorageError;
use crate::types::{SessionId, SessionSummary};

/// The storage contract for dialog sessions.
///
/// The trait is synchronous; a context is only touched by one caller at a
/// time.
pub trait SessionStore {
    /// Creates a new empty session with the given name.
    fn create_session(&mut self, name: &str) -> Result<SessionId, StorageError>;

    /// Replaces the session's stored snapshot.
    fn save_snapshot(&mut self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), StorageError>;

    /// Loads the session's latest snapshot, verifying its digest.
    fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError>;

    /// Deletes a session and its snapshot.
    fn delete_session(&mut self, id: SessionId) -> Result<(), StorageError>;

    /// Lists all stored sessions, ordered by id.
    fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError>;

    // -------------------------------------------------------------------
    // High-level convenience methods
    // -------------------------------------------------------------------

    /// Dumps `ctx` and stores it under `id`.
    fn save_context(&mut self, id: SessionId, ctx: &DialogContext) -> Result<(), StorageError> {
        self.save_snapshot(id, &dump_context(ctx))
    }

    /// Loads the snapshot under `id` and rebuilds it against `registry`.
    fn load_context(
        &self,
        id: SessionId,
        registry: Arc<TypeRegistry>,
    ) -> Result<DialogContext, StorageError> {
        restore_context(registry, self.load_snapshot(id)?)
    }
}
