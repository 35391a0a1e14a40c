//! In-memory implementation of [`SessionStore`].
//!
//! [`InMemoryStore`] is the backend for tests and for sessions that do not
//! need to outlive the process. Snapshots are kept in their canonical byte
//! encoding with the same digest checks as the SQLite backend.

use std::collections::BTreeMap;

use crate::convert::SessionSnapshot;
use crate::error::StorageError;
use crate::hash::{canonical_bytes, digest_bytes, verify_digest};
use crate::traits::SessionStore;
use crate::types::{SessionId, SessionSummary};

#[derive(Debug, Clone)]
struct StoredSession {
    name: String,
    snapshot: Option<StoredSnapshot>,
}

#[derive(Debug, Clone)]
struct StoredSnapshot {
    turn_num: u32,
    digest: String,
    body: Vec<u8>,
}

/// Session store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: BTreeMap<i64, StoredSession>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn session(&self, id: SessionId) -> Result<&StoredSession, StorageError> {
        self.sessions
            .get(&id.0)
            .ok_or(StorageError::SessionNotFound(id.0))
    }

    #[cfg(test)]
    fn corrupt(&mut self, id: SessionId) {
        if let Some(stored) = self.sessions.get_mut(&id.0).and_then(|s| s.snapshot.as_mut()) {
            stored.body.push(b' ');
        }
    }
}

impl SessionStore for InMemoryStore {
    fn create_session(&mut self, name: &str) -> Result<SessionId, StorageError> {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.sessions.insert(
            id,
            StoredSession {
                name: name.to_string(),
                snapshot: None,
            },
        );
        Ok(SessionId(id))
    }

    fn save_snapshot(&mut self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let body = canonical_bytes(snapshot)?;
        let digest = digest_bytes(&body).to_hex().to_string();
        let session = self
            .sessions
            .get_mut(&id.0)
            .ok_or(StorageError::SessionNotFound(id.0))?;
        session.snapshot = Some(StoredSnapshot {
            turn_num: snapshot.turn_num,
            digest,
            body,
        });
        Ok(())
    }

    fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError> {
        let stored = self
            .session(id)?
            .snapshot
            .as_ref()
            .ok_or(StorageError::EmptySession(id.0))?;
        verify_digest(&stored.body, &stored.digest, id.0)?;
        Ok(serde_json::from_slice(&stored.body)?)
    }

    fn delete_session(&mut self, id: SessionId) -> Result<(), StorageError> {
        self.sessions
            .remove(&id.0)
            .map(|_| ())
            .ok_or(StorageError::SessionNotFound(id.0))
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(self
            .sessions
            .iter()
            .map(|(id, s)| SessionSummary {
                id: SessionId(*id),
                name: s.name.clone(),
                turn_num: s.snapshot.as_ref().map_or(0, |snap| snap.turn_num),
                digest: s.snapshot.as_ref().map(|snap| snap.digest.clone()),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use dfg_core::{DialogContext, TypeRegistry};
    use dfg_engine::{process_turn, ConstructOptions};

    #[test]
    fn save_load_and_corruption() {
        let mut store = InMemoryStore::new();
        let id = store.create_session("demo").unwrap();
        assert!(matches!(store.load_snapshot(id), Err(StorageError::EmptySession(_))));

        let registry = Arc::new(TypeRegistry::new());
        let mut ctx = DialogContext::new(registry.clone());
        process_turn(&mut ctx, "NOT(yes)", &ConstructOptions::default()).unwrap();
        store.save_context(id, &ctx).unwrap();

        let loaded = store.load_context(id, registry).unwrap();
        assert_eq!(loaded.state().nodes, ctx.state().nodes);

        store.corrupt(id);
        assert!(matches!(
            store.load_snapshot(id),
            Err(StorageError::DigestMismatch { .. })
        ));
    }
}
