//! Storage error types for dfg-storage.
//!
//! [`StorageError`] covers database and migration failures, serialization,
//! missing sessions, and snapshots that cannot be turned back into a context.

use dfg_core::NodeId;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session not found: {0}")]
    SessionNotFound(i64),

    /// The session has been created but nothing was saved yet.
    #[error("session {0} has no snapshot")]
    EmptySession(i64),

    /// A snapshot names a type the registry does not know.
    #[error("unknown node type '{type_name}' on node {node}")]
    UnknownNodeType { node: NodeId, type_name: String },

    /// A snapshot refers to a node it does not contain.
    #[error("dangling reference from {from} to node {to}")]
    DanglingReference { from: String, to: NodeId },

    /// Two node records in a snapshot share an id.
    #[error("node {0} appears more than once in the snapshot")]
    DuplicateNode(NodeId),

    /// The stored digest does not match the stored snapshot.
    #[error("snapshot digest mismatch for session {session}")]
    DigestMismatch { session: i64 },

    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}
