//! Storage-layer types for session identity and metadata.
//!
//! [`SessionId`] is defined here rather than in dfg-core because session
//! identity is a storage concern: a dialog only gains an id when persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a stored session.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

/// Summary of a stored session (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: String,
    /// Turn number of the latest snapshot, 0 if none was saved.
    pub turn_num: u32,
    /// Hex blake3 digest of the latest snapshot.
    pub digest: Option<String>,
}
